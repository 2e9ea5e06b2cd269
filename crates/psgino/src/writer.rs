//! Register output abstraction.

/// Destination for PSG register writes.
///
/// Implemented for any `FnMut(u8, u8)` closure, so a bus driver can be
/// passed inline.
///
/// # Example
///
/// ```
/// use psgino::RegisterWriter;
///
/// fn mute_all<W: RegisterWriter>(out: &mut W) {
///     out.write_register(0x07, 0x3F); // Mixer: everything off
/// }
///
/// let mut last = (0, 0);
/// mute_all(&mut |addr, data| last = (addr, data));
/// assert_eq!(last, (7, 0x3F));
/// ```
pub trait RegisterWriter {
    /// Write one register.
    ///
    /// # Arguments
    ///
    /// * `addr` - Register address (0x00-0x0F)
    /// * `data` - Register value
    fn write_register(&mut self, addr: u8, data: u8);

    /// Write all 16 registers in address order.
    fn write_all(&mut self, regs: &[u8; 16]) {
        for (addr, &data) in regs.iter().enumerate() {
            self.write_register(addr as u8, data);
        }
    }
}

impl<F> RegisterWriter for F
where
    F: FnMut(u8, u8),
{
    #[inline]
    fn write_register(&mut self, addr: u8, data: u8) {
        self(addr, data)
    }
}
