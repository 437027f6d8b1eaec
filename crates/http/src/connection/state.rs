/// Where a connection is in its request/response cycle.
///
/// ```text
/// Idle -> AccumulatingHead -> AccumulatingBody -> Dispatching -> Writing -> Idle
///                                                                       \-> Closing
/// ```
///
/// Any protocol violation, write failure or non-persistent response ends in `Closing`,
/// which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No request in progress and nothing buffered
    Idle,
    /// Bytes of the next request head are buffered but the head isn't complete
    AccumulatingHead,
    /// A head was accepted and its body is being collected
    AccumulatingBody,
    /// The completed request is with the controller
    Dispatching,
    /// The response is being written
    Writing,
    Closing,
}

impl ConnectionState {
    /// True once a new head may be read
    #[inline]
    pub fn is_idle(&self) -> bool {
        matches!(self, ConnectionState::Idle)
    }

    #[inline]
    pub fn is_closing(&self) -> bool {
        matches!(self, ConnectionState::Closing)
    }
}
