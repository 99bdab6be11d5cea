//! The discovery engine: transports that put ARP frames on the wire, the
//! correlator that turns captured replies into bindings, and the scanner that
//! drives both across a target range.

pub mod correlator;
pub mod network;
pub mod scanner;
pub mod signal;
pub mod transport;
