//! Transport seam and scoped sessions.
//!
//! A transport is a single connection to one physical reader. It is owned
//! by exactly one orchestration at a time: the writer and reader borrow it
//! mutably for their whole exchange sequence, so commands from two
//! operations can never interleave.

use crate::apdu::{Command, Response};
use crate::error::TransportError;
use std::ops::{Deref, DerefMut};

/// Command/response link to a tag reader.
pub trait Transport {
    /// Acquire the reader. Fails with `TransportError::Unavailable` when no
    /// reader is present or it is in use.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Perform one command/response exchange. Blocks until the reader answers.
    fn transmit(&mut self, command: &Command) -> Result<Response, TransportError>;

    /// Release the reader. Must be safe to call on any exit path.
    fn disconnect(&mut self);
}

/// A connected transport, disconnected when dropped.
pub struct Session<'t, T: Transport + ?Sized> {
    transport: &'t mut T,
}

impl<'t, T: Transport + ?Sized> Session<'t, T> {
    /// Connect and return a guard that releases the transport on drop.
    pub fn open(transport: &'t mut T) -> Result<Self, TransportError> {
        transport.connect()?;
        tracing::debug!("transport connected");
        Ok(Self { transport })
    }
}

impl<T: Transport + ?Sized> Deref for Session<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.transport
    }
}

impl<T: Transport + ?Sized> DerefMut for Session<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.transport
    }
}

impl<T: Transport + ?Sized> Drop for Session<'_, T> {
    fn drop(&mut self) {
        self.transport.disconnect();
        tracing::debug!("transport released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimConfig, SimulatedTag};

    #[test]
    fn test_session_releases_on_drop() {
        let mut tag = SimulatedTag::new(SimConfig::default());
        {
            let _session = Session::open(&mut tag).unwrap();
        }
        assert_eq!(tag.connects(), 1);
        assert_eq!(tag.disconnects(), 1);
        assert!(!tag.is_connected());
    }

    #[test]
    fn test_session_open_unavailable() {
        let mut tag = SimulatedTag::new(SimConfig {
            unavailable: true,
            ..SimConfig::default()
        });
        let result = Session::open(&mut tag);
        assert!(matches!(result, Err(TransportError::Unavailable(_))));
        drop(result);
        assert_eq!(tag.disconnects(), 0);
    }

    #[test]
    fn test_transmit_requires_connection() {
        let mut tag = SimulatedTag::new(SimConfig::default());
        let result = tag.transmit(&Command::read_block(0, 16));
        assert_eq!(result, Err(TransportError::NotConnected));
    }
}
