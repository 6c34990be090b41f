/// Transport capacity used when no connection in a port group asks for one
pub const DEFAULT_BUFFER_SIZE: usize = 1;
/// Smallest transport capacity; a zero-capacity queue could never accept a packet
pub const MIN_BUFFER_SIZE: usize = 1;
