use super::{Queue, QueueError, QueueMessage};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

const MAX_MESSAGES: usize = 10;

#[derive(Default)]
struct State {
  next_id: usize,
  visible: VecDeque<QueueMessage>,
  in_flight: Vec<QueueMessage>,
  deleted: Vec<String>,
  failing_receives: usize,
}

/// In-process queue. Received messages stay in flight until deleted or
/// `expire_visibility` returns them to the queue.
#[derive(Default)]
pub struct MemoryQueue {
  state: Mutex<State>,
}

impl MemoryQueue {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&self, body: impl Into<String>) -> String {
    let mut state = self.lock();
    state.next_id += 1;
    let next_id = state.next_id;
    let receipt_handle = format!("receipt-{}", next_id);

    state.visible.push_back(QueueMessage {
      message_id: Some(format!("message-{}", next_id)),
      body: body.into(),
      receipt_handle: receipt_handle.clone(),
    });

    receipt_handle
  }

  /// Makes the next `count` receives fail as if the queue were unreachable.
  pub fn fail_receives(&self, count: usize) {
    self.lock().failing_receives = count;
  }

  pub fn expire_visibility(&self) {
    let mut state = self.lock();
    let in_flight = std::mem::take(&mut state.in_flight);
    state.visible.extend(in_flight);
  }

  pub fn deleted(&self) -> Vec<String> {
    self.lock().deleted.clone()
  }

  pub fn visible(&self) -> usize {
    self.lock().visible.len()
  }

  pub fn in_flight(&self) -> usize {
    self.lock().in_flight.len()
  }

  fn lock(&self) -> MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(|e| e.into_inner())
  }
}

#[rocket::async_trait]
impl Queue for MemoryQueue {
  async fn receive(&self) -> Result<Vec<QueueMessage>, QueueError> {
    let mut state = self.lock();

    if state.failing_receives > 0 {
      state.failing_receives -= 1;
      return Err(QueueError::Request("queue unreachable".to_owned()));
    }

    let count = state.visible.len().min(MAX_MESSAGES);
    let messages = state.visible.drain(..count).collect::<Vec<_>>();
    state.in_flight.extend(messages.iter().cloned());

    Ok(messages)
  }

  async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
    let mut state = self.lock();
    state
      .in_flight
      .retain(|message| message.receipt_handle != receipt_handle);
    state.deleted.push(receipt_handle.to_owned());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn pushed_messages_get_distinct_ids() {
    let queue = MemoryQueue::new();
    let first = queue.push("a");
    let second = queue.push("b");

    assert_ne!(first, second);

    let messages = queue.receive().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].message_id.as_deref(), Some("message-1"));
    assert_eq!(messages[1].message_id.as_deref(), Some("message-2"));
    assert_eq!(messages[1].receipt_handle, second);
    assert_eq!(queue.in_flight(), 2);
  }

  #[tokio::test]
  async fn receives_at_most_ten() {
    let queue = MemoryQueue::new();
    for index in 0..12 {
      queue.push(index.to_string());
    }

    assert_eq!(queue.receive().await.unwrap().len(), 10);
    assert_eq!(queue.visible(), 2);
  }
}
