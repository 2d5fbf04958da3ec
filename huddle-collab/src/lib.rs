mod ai;
mod events;
mod lifecycle;
mod sessions;
mod store;
mod util;

use std::{sync::Arc, thread};

pub use ai::*;
pub use events::*;
pub use lifecycle::*;
pub use sessions::*;
pub use store::*;

use crossbeam::channel::unbounded;
use huddle_core::{get_or_create_handle, Config, Coordinator, CoreEvent};
use log::warn;

/// The huddle collaboration system, facilitating room coordination, session
/// lifecycle, transcripts, and the external collaborators.
pub struct Huddle<Db, Ai> {
    pub coordinator: Arc<Coordinator>,
    pub sessions: SessionManager<Db, Ai>,
    pub lifecycle: LifecycleBridge<Db, Ai>,

    context: HuddleContext<Db, Ai>,
    event_receiver: EventReceiver,
}

/// A type passed to the collab components, to access state, reach the
/// external collaborators, and emit events.
pub struct HuddleContext<Db, Ai> {
    pub config: Config,
    pub coordinator: Arc<Coordinator>,
    pub store: Arc<Db>,
    pub ai: Arc<Ai>,

    event_sender: EventSender,
}

impl<Db, Ai> Huddle<Db, Ai>
where
    Db: Store,
    Ai: Transcriber + Summarizer,
{
    pub fn new(config: Config, store: Db, ai: Ai) -> Self {
        let coordinator = Arc::new(Coordinator::new(config.clone()));
        let (event_sender, event_receiver) = unbounded();

        let context = HuddleContext {
            config,
            coordinator: coordinator.clone(),
            store: Arc::new(store),
            ai: Arc::new(ai),
            event_sender,
        };

        let sessions = SessionManager::new(&context);
        let lifecycle = LifecycleBridge::new(&context);

        Self {
            coordinator,
            sessions,
            lifecycle,
            context,
            event_receiver,
        }
    }

    /// Starts the pump that turns core events into persistence and lifecycle
    /// side effects. Call once, from within a tokio runtime.
    ///
    /// The side effects are asynchronous on purpose: signaling must never
    /// wait for a store or AI round trip.
    pub fn run(&self) {
        let context = self.context.clone();
        let lifecycle = self.lifecycle.clone();
        let handle = get_or_create_handle();

        thread::spawn(move || loop {
            let event = context.coordinator.wait_for_event();

            match &event {
                CoreEvent::MemberJoined {
                    session_id,
                    member_count: 1,
                    ..
                } => {
                    let lifecycle = lifecycle.clone();
                    let session_id = session_id.clone();

                    handle.spawn(async move {
                        lifecycle.activate_session(&session_id).await;
                    });
                }
                CoreEvent::FragmentAppended {
                    session_id,
                    fragment,
                } => {
                    let store = context.store.clone();
                    let session_id = session_id.clone();
                    let fragment = fragment.clone();

                    handle.spawn(async move {
                        if let Err(err) = store.append_fragment(&session_id, fragment).await {
                            warn!(
                                "Failed to persist fragment for session {}: {}",
                                session_id, err
                            );
                        }
                    });
                }
                _ => {}
            }

            context.emit(HuddleEvent::from_core_event(event));
        });
    }

    /// Receive events from the collab system.
    pub fn wait_for_event(&self) -> HuddleEvent {
        self.event_receiver
            .recv()
            .expect("event is received without error")
    }

    #[cfg(test)]
    pub(crate) fn context(&self) -> &HuddleContext<Db, Ai> {
        &self.context
    }
}

impl<Db, Ai> HuddleContext<Db, Ai> {
    pub(crate) fn emit(&self, event: HuddleEvent) {
        self.event_sender.send(event).expect("event is sent");
    }
}

impl<Db, Ai> Clone for HuddleContext<Db, Ai> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            coordinator: self.coordinator.clone(),
            store: self.store.clone(),
            ai: self.ai.clone(),
            event_sender: self.event_sender.clone(),
        }
    }
}
