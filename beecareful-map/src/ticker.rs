//! Background timer driving long-press timeouts and drag auto-scroll.

use crate::controller::MapController;
use crate::gesture::{Clock, MapEvent};
use crate::Shared;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

pub struct TickerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TickerHandle {
    /// Stops the loop and waits for it to exit. The event channel closes.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Calls `MapController::tick` every `period` and forwards the events.
///
/// The loop ends when the handle is stopped or the receiver is dropped.
pub fn spawn_ticker<C>(
    controller: Shared<MapController<C>>,
    period: Duration,
) -> (TickerHandle, mpsc::UnboundedReceiver<MapEvent>)
where
    C: Clock + 'static,
{
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let events = controller.lock().tick();
                    for event in events {
                        if events_tx.send(event).is_err() {
                            debug!("map ticker receiver dropped, stopping");
                            return;
                        }
                    }
                }
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        debug!("map ticker stopped");
                        return;
                    }
                }
            }
        }
    });

    (TickerHandle { stop: stop_tx, task }, events_rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::HiveMarker;
    use crate::gesture::{PointerTarget, VirtualClock, LONG_PRESS, TICK_PERIOD};
    use crate::new_shared;
    use crate::viewport::{ScreenPoint, Viewport};

    #[tokio::test(start_paused = true)]
    async fn test_ticker_fires_long_press() {
        let clock = VirtualClock::new();
        let mut ctrl = MapController::new(clock.clone(), Viewport::new(800.0, 800.0));
        ctrl.load_hives(vec![HiveMarker::new(1, 400.0, 400.0)]);
        ctrl.pointer_down(PointerTarget::Hive(1), ScreenPoint::new(400.0, 400.0));
        let ctrl = new_shared(ctrl);

        let (handle, mut events) = spawn_ticker(ctrl.clone(), TICK_PERIOD);
        clock.advance(LONG_PRESS);

        assert_eq!(events.recv().await, Some(MapEvent::DragStarted(1)));
        assert_eq!(ctrl.lock().dragging_id(), Some(1));

        handle.stop().await;
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_auto_scrolls_while_dragging() {
        let clock = VirtualClock::new();
        let mut ctrl = MapController::new(clock.clone(), Viewport::new(800.0, 800.0));
        ctrl.load_hives(vec![HiveMarker::new(1, 400.0, 400.0)]);
        ctrl.pointer_down(PointerTarget::Hive(1), ScreenPoint::new(400.0, 400.0));
        clock.advance(LONG_PRESS);
        ctrl.tick();
        ctrl.pointer_move(ScreenPoint::new(400.0, 780.0));
        let ctrl = new_shared(ctrl);

        let (handle, mut events) = spawn_ticker(ctrl.clone(), TICK_PERIOD);
        let mut scrolled = 0;
        while scrolled < 3 {
            if let Some(MapEvent::Scrolled { .. }) = events.recv().await {
                scrolled += 1;
            }
        }
        handle.stop().await;

        assert_eq!(ctrl.lock().viewport().scroll_top, 30.0);
    }
}
