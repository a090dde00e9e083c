use taskpool::{Buffer, Error};

use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn type_bounds() {
    fn is_send<T: Send>() {}
    fn is_sync<T: Sync>() {}

    is_send::<Buffer<usize>>();
    is_sync::<Buffer<usize>>();
}

#[test]
fn construct() {
    let buffer = Buffer::<usize>::new(2);
    assert_eq!(buffer.size(), 0);
    assert_eq!(buffer.capacity(), 2);
}

#[test]
#[should_panic(expected = "capacity must be positive")]
fn construct_invalid() {
    Buffer::<usize>::new(0);
}

#[test]
fn set_capacity_when_empty() {
    let buffer = Buffer::<usize>::new(2);
    buffer.set_capacity(5);
    assert_eq!(buffer.capacity(), 5);
    buffer.set_capacity(3);
    assert_eq!(buffer.capacity(), 3);
}

#[test]
#[should_panic(expected = "capacity must be positive")]
fn set_capacity_to_zero() {
    let buffer = Buffer::<usize>::new(2);
    buffer.set_capacity(0);
}

#[test]
fn set_capacity_when_filled() {
    let buffer = Buffer::new(2);
    buffer.push(4);
    buffer.push(2);
    buffer.set_capacity(5);
    buffer.pull().unwrap();
    buffer.pull().unwrap();
    buffer.set_capacity(1);
}

#[test]
#[should_panic(expected = "below the current buffer size")]
fn set_capacity_below_size() {
    let buffer = Buffer::new(2);
    buffer.push(4);
    buffer.push(2);
    buffer.set_capacity(1);
}

#[test]
fn push_and_pull_in_order() {
    let buffer = Buffer::new(2);
    buffer.push(4);
    buffer.push(2);
    assert_eq!(buffer.size(), 2);
    assert_eq!(buffer.pull().unwrap(), 4);
    assert_eq!(buffer.pull().unwrap(), 2);
    assert_eq!(buffer.size(), 0);
}

// Spec scenario: a relay thread moves elements from one buffer into
// another and is shut down through the consumer interrupt.
#[test]
fn handoff_between_buffers() {
    let input = Arc::new(Buffer::new(2));
    let output = Arc::new(Buffer::new(2));

    let relay = {
        let input = Arc::clone(&input);
        let output = Arc::clone(&output);
        thread::spawn(move || {
            while let Ok(element) = input.pull() {
                output.push(element);
            }
        })
    };

    input.push(4);
    input.push(2);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(input.size(), 0);
    assert_eq!(output.size(), 2);
    assert_eq!(output.pull().unwrap(), 4);
    assert_eq!(output.size(), 1);
    assert_eq!(output.pull().unwrap(), 2);
    assert_eq!(output.size(), 0);

    input.interrupt_consume();
    relay.join().unwrap();
}

#[test]
fn interrupt_fails_one_empty_pull() {
    let buffer = Buffer::<usize>::new(2);
    buffer.interrupt_consume();
    assert_eq!(buffer.pull(), Err(Error::Interrupted));

    // The latch is cleared: the buffer keeps working afterwards.
    buffer.push(7);
    assert_eq!(buffer.pull().unwrap(), 7);
}

#[test]
fn interrupt_does_not_discard_elements() {
    let buffer = Buffer::new(2);
    buffer.push(1);
    buffer.interrupt_consume();
    // A buffered element wins over the interrupt.
    assert_eq!(buffer.pull().unwrap(), 1);
    assert_eq!(buffer.pull(), Err(Error::Interrupted));
}

#[test]
fn push_blocks_until_capacity_frees() {
    let buffer = Arc::new(Buffer::new(1));
    buffer.push(1);

    let producer = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            buffer.push(2);
            buffer.push(3);
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert_eq!(buffer.size(), 1);
    assert_eq!(buffer.pull().unwrap(), 1);
    assert_eq!(buffer.pull().unwrap(), 2);
    assert_eq!(buffer.pull().unwrap(), 3);
    producer.join().unwrap();
}
