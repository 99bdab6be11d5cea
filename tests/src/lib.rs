//! Integration tests for the scanner, run against a simulated segment.


#[cfg(test)]
mod discovery;
#[cfg(test)]
mod interface;
