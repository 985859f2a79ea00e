//! 核心宏定义
//!
//! 配置结构体的默认值集中在一处声明

/// 为结构体实现Default trait的宏
///
/// 使用示例:
/// ```rust
/// use ar_particles::impl_default;
///
/// struct EmitterLimits {
///     capacity: usize,
///     max_lifespan: f32,
/// }
///
/// impl_default!(EmitterLimits {
///     capacity: 100,
///     max_lifespan: 100.0,
/// });
///
/// assert_eq!(EmitterLimits::default().capacity, 100);
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}
