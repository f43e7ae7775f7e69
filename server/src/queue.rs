//! FIFO event queue between the connection readers and the game loop.
//!
//! Any number of readers push [`Command`]s through cloned [`EventSender`]s;
//! exactly one [`EventQueue`] drains them, oldest first. Receiving suspends
//! the game loop while the queue is empty.

use shared::Request;
use tokio::sync::mpsc;

/// Seat index of a connection; seats are assigned in accept order.
pub type ConnectionId = usize;

/// One decoded client request, tagged with the connection it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub origin: ConnectionId,
    pub request: Request,
}

impl Command {
    pub fn new(origin: ConnectionId, request: Request) -> Self {
        Self { origin, request }
    }
}

/// Producer handle held by each connection reader.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Command>,
}

impl EventSender {
    /// Appends a command. Returns false once the game loop has gone away.
    pub fn push(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }
}

/// Consumer side, owned by the game loop.
#[derive(Debug)]
pub struct EventQueue {
    rx: mpsc::UnboundedReceiver<Command>,
}

impl EventQueue {
    pub fn new() -> (EventSender, EventQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSender { tx }, EventQueue { rx })
    }

    /// Waits for the oldest command. `None` once every sender is dropped and
    /// the queue is drained.
    pub async fn next(&mut self) -> Option<Command> {
        self.rx.recv().await
    }

    /// Takes the oldest command without waiting.
    pub fn try_next(&mut self) -> Option<Command> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_single_producer_is_fifo() {
        let (sender, mut queue) = EventQueue::new();
        assert!(sender.push(Command::new(0, Request::GiveDeck)));
        assert!(sender.push(Command::new(0, Request::CardPlay(3))));
        assert!(sender.push(Command::new(0, Request::NoPlayables)));

        assert_eq!(queue.try_next(), Some(Command::new(0, Request::GiveDeck)));
        assert_eq!(queue.try_next(), Some(Command::new(0, Request::CardPlay(3))));
        assert_eq!(queue.try_next(), Some(Command::new(0, Request::NoPlayables)));
        assert_eq!(queue.try_next(), None);
    }

    #[tokio::test]
    async fn test_concurrent_producers_keep_per_origin_order() {
        let (sender, mut queue) = EventQueue::new();

        let mut handles = Vec::new();
        for origin in 0..4 {
            let sender = sender.clone();
            handles.push(tokio::spawn(async move {
                for index in 0..100 {
                    sender.push(Command::new(origin, Request::CardPlay(index)));
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        drop(sender);

        let mut last_seen = [None; 4];
        let mut total = 0;
        while let Some(command) = queue.next().await {
            let Request::CardPlay(index) = command.request else {
                panic!("unexpected request {:?}", command.request);
            };
            if let Some(previous) = last_seen[command.origin] {
                assert!(index > previous);
            }
            last_seen[command.origin] = Some(index);
            total += 1;
        }
        assert_eq!(total, 400);
    }

    #[tokio::test]
    async fn test_next_waits_for_a_command() {
        let (sender, mut queue) = EventQueue::new();
        assert!(timeout(Duration::from_millis(20), queue.next()).await.is_err());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            sender.push(Command::new(2, Request::GivePlays));
        });
        let command = timeout(Duration::from_secs(1), queue.next()).await.unwrap();
        assert_eq!(command, Some(Command::new(2, Request::GivePlays)));
        assert_eq!(queue.next().await, None);
    }

    #[test]
    fn test_push_after_consumer_dropped() {
        let (sender, queue) = EventQueue::new();
        drop(queue);
        assert!(!sender.push(Command::new(0, Request::GiveDeck)));
    }
}
