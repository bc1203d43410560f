//! Test utilities for usb-devctl
//!
//! Helpers for building a populated device dispatcher in tests.
//!
//! # Example
//!
//! ```
//! use common::test_utils::create_test_dispatcher;
//! use protocol::ResourceId;
//!
//! let (dispatcher, _memories) = create_test_dispatcher(&[&[5, 7], &[9]]);
//! assert_eq!(dispatcher.table().search(ResourceId(9)), Some(1));
//! ```

use crate::memory::{MemoryHandle, build_memory_device};
use device::Dispatcher;
use protocol::CURRENT_VERSION;

/// Build a dispatcher with one memory interface per resource list
///
/// Interface `i` owns `layout[i]`. Panics if the layout is inconsistent.
pub fn create_test_dispatcher(layout: &[&[u8]]) -> (Dispatcher, Vec<MemoryHandle>) {
    build_memory_device(CURRENT_VERSION, layout).expect("test layout must register cleanly")
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{Command, CommandCode, ResourceId, SetupPacket, Transaction};

    #[test]
    fn test_create_test_dispatcher() {
        let (mut dispatcher, handles) = create_test_dispatcher(&[&[5, 7], &[9]]);
        assert_eq!(handles.len(), 2);

        let code = CommandCode::new(1).unwrap();
        let t = Transaction::new(ResourceId(9), Command::write(code), 2).unwrap();
        let mut data = [0xAB, 0xCD];
        dispatcher
            .handle_setup(&SetupPacket::for_transaction(&t), &mut data)
            .unwrap();
        assert_eq!(handles[1].get(9, 1), Some(vec![0xAB, 0xCD]));
        assert!(handles[0].is_empty());
    }
}
