// Commands - Control thread -> fill loop

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Jump back to bar 0, tick 0 at the next block boundary
    Rewind,
    /// Leave the fill loop
    Stop,
}
