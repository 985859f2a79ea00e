//! 无头帧循环
//!
//! 以固定时间步长驱动 [`SimulationController`]。可选的自动模式切换在独立线程中
//! 产生，经 UI 信号通道送回模拟线程。

use crate::config::{LoggingConfig, SimulationConfig};
use crate::core::controller::{EmitterKind, SimulationController, UiSignal};
use crate::core::error::SimulationResult;
use crate::particles::EmitterStats;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// 一次运行的结果汇总
#[derive(Debug, Clone)]
pub struct RunReport {
    pub frames: u64,
    pub toggles_requested: u64,
    pub final_kind: Option<EmitterKind>,
    pub final_population: usize,
    pub final_stats: EmitterStats,
    pub elapsed: Duration,
}

/// 引擎入口
pub struct Engine;

impl Engine {
    /// 运行帧循环直到达到配置的帧数
    pub fn run(config: SimulationConfig) -> SimulationResult<RunReport> {
        Self::initialize_logging(&config.logging);

        let loop_config = config.engine.clone();
        let fixed_step = loop_config.fixed_time_step();
        let mut controller = SimulationController::new(config)?;

        // 自动切换线程：按帧号决定何时发送切换信号
        let (frame_tx, frame_rx) = crossbeam_channel::unbounded::<u64>();
        let signals = controller.signals();
        let toggle_every = loop_config.toggle_every_frames;
        let toggler = thread::Builder::new()
            .name("mode-toggler".to_string())
            .spawn(move || {
                let mut sent = 0u64;
                for frame in frame_rx.iter() {
                    if toggle_every > 0 && frame % toggle_every == 0 {
                        if signals.send(UiSignal::TogglePhysics).is_err() {
                            break;
                        }
                        sent += 1;
                    }
                }
                sent
            })?;

        let started = Instant::now();
        let mut last_time = started;
        let mut accumulator = 0.0f64;

        while controller.frame() < loop_config.frames {
            let now = Instant::now();
            accumulator += now.duration_since(last_time).as_secs_f64();
            last_time = now;

            while accumulator >= fixed_step && controller.frame() < loop_config.frames {
                controller.tick(fixed_step as f32)?;
                accumulator -= fixed_step;
                let _ = frame_tx.send(controller.frame());
            }

            let frame_budget = Duration::from_secs_f64((fixed_step - accumulator).max(0.0));
            if !frame_budget.is_zero() {
                thread::sleep(frame_budget);
            }
        }

        drop(frame_tx);
        let toggles_requested = toggler.join().unwrap_or_else(|_| {
            tracing::warn!(target: "engine", "mode toggler thread panicked");
            0
        });

        let report = RunReport {
            frames: controller.frame(),
            toggles_requested,
            final_kind: controller.active_kind(),
            final_population: controller.active().map_or(0, |active| active.len()),
            final_stats: controller
                .active()
                .map(|active| active.stats())
                .unwrap_or_default(),
            elapsed: started.elapsed(),
        };

        tracing::info!(
            target: "engine",
            frames = report.frames,
            toggles = report.toggles_requested,
            kind = ?report.final_kind,
            population = report.final_population,
            "Engine shutting down"
        );
        Ok(report)
    }

    /// 初始化日志系统
    ///
    /// 日志级别优先取 `RUST_LOG`，否则使用配置中的级别。
    pub fn initialize_logging(config: &LoggingConfig) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()));
        let span_events = if config.log_frame_spans {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(span_events)
            .try_init();
        tracing::info!(target: "engine", "Engine starting");
    }
}
