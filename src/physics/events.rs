//! 碰撞事件总线
//!
//! rapier 在 `step` 内回调 `EventHandler`，这里把碰撞开始事件转换成场景实体 ID，
//! 通过 crossbeam 通道投递。任何线程都可以持有 `feed()` 返回的发送端注入事件，
//! 事件只会在 `dispatch()`（模拟线程）中分发给订阅者，跨线程只是一次转投，不加锁。

use bevy_ecs::entity::Entity;
use crossbeam_channel::{unbounded, Receiver, Sender};
use rapier3d::prelude::*;

/// 碰撞开始事件
///
/// 环境几何体（例如静态地面）不对应场景实体，对应参与者为 `None`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionBegan {
    pub a: Option<Entity>,
    pub b: Option<Entity>,
}

impl CollisionBegan {
    pub fn between(a: Entity, b: Entity) -> Self {
        Self {
            a: Some(a),
            b: Some(b),
        }
    }

    /// 与环境几何体的碰撞
    pub fn with_environment(entity: Entity) -> Self {
        Self {
            a: Some(entity),
            b: None,
        }
    }

    pub fn participants(&self) -> impl Iterator<Item = Entity> {
        self.a.into_iter().chain(self.b)
    }
}

/// 碰撞订阅
///
/// 丢弃（或 `cancel`）即退订：总线在下一次分发时清理断开的发送端。
pub struct CollisionSubscription {
    receiver: Receiver<CollisionBegan>,
}

impl CollisionSubscription {
    /// 取出当前已送达的全部事件，不阻塞
    pub fn drain(&self) -> impl Iterator<Item = CollisionBegan> + '_ {
        self.receiver.try_iter()
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    pub fn cancel(self) {}
}

/// 碰撞事件总线
pub struct CollisionEventBus {
    feed_tx: Sender<CollisionBegan>,
    feed_rx: Receiver<CollisionBegan>,
    subscribers: Vec<Sender<CollisionBegan>>,
}

impl Default for CollisionEventBus {
    fn default() -> Self {
        let (feed_tx, feed_rx) = unbounded();
        Self {
            feed_tx,
            feed_rx,
            subscribers: Vec::new(),
        }
    }
}

impl CollisionEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> CollisionSubscription {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        CollisionSubscription { receiver: rx }
    }

    /// 事件入口（可跨线程克隆）
    pub fn feed(&self) -> Sender<CollisionBegan> {
        self.feed_tx.clone()
    }

    pub(crate) fn forwarder(&self) -> CollisionForwarder {
        CollisionForwarder {
            sender: self.feed_tx.clone(),
        }
    }

    /// 把入口中排队的事件分发给订阅者，返回分发的事件数
    pub fn dispatch(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.feed_rx.try_recv() {
            self.publish(event);
            count += 1;
        }
        count
    }

    /// 直接分发一个事件
    pub fn publish(&mut self, event: CollisionBegan) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    /// 存活的订阅数（已退订但尚未分发过的也计入）
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// 碰撞体 `user_data` 中保存的场景实体
pub(crate) fn entity_from_user_data(user_data: u128) -> Option<Entity> {
    if user_data == 0 {
        return None;
    }
    Entity::try_from_bits(user_data as u64).ok()
}

pub(crate) fn entity_to_user_data(entity: Entity) -> u128 {
    entity.to_bits() as u128
}

/// rapier 事件回调，只转发碰撞开始事件
pub(crate) struct CollisionForwarder {
    sender: Sender<CollisionBegan>,
}

impl EventHandler for CollisionForwarder {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if !event.started() {
            return;
        }
        let lookup = |handle: ColliderHandle| {
            colliders
                .get(handle)
                .and_then(|collider| entity_from_user_data(collider.user_data))
        };
        let began = CollisionBegan {
            a: lookup(event.collider1()),
            b: lookup(event.collider2()),
        };
        if began.a.is_some() || began.b.is_some() {
            let _ = self.sender.send(began);
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}
