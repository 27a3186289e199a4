//! The relocatable clock-update routine.
//!
//! While PLLA and the master clock divider are being reprogrammed, neither
//! the DDR behind the caches nor the bus the kernel text sits on can be
//! trusted, so the sequence runs from a copy staged in a stable window (see
//! [`crate::reloc`]). The code therefore has to survive being copied: every
//! access is relative to the argument registers, branches are PC-relative,
//! there are no calls, and the stack is not touched.
//!
//! Calling convention (AAPCS):
//!
//! | reg | value |
//! |-----|-------|
//! | r0  | PMC base address |
//! | r1  | `PMC_PLLAR` value |
//! | r2  | `PMC_MCKR.MDIV` field |
//! | r3  | DDR controller base address |
//!
//! Sequence: read back `RTR` to drain the refresh write posted just before,
//! write `PLLAR`, wait for `LOCKA`, update `MDIV`, wait for `MCKRDY`. The
//! multiplier must lock before the divider moves; the other order passes
//! through a frequency neither recipe was validated for. Neither wait has a
//! timeout: if the PLL never locks the system is lost anyway.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "arm")] {
        core::arch::global_asm!(
            ".section .text.__update_cpu_clock,\"ax\",%progbits",
            ".arm",
            ".balign 4",
            ".global __update_cpu_clock",
            ".type __update_cpu_clock, %function",
            "__update_cpu_clock:",
            "    ldr ip, [r3, #0x04]",
            "    str r1, [r0, #0x28]",
            ".Lwait_locka:",
            "    ldr ip, [r0, #0x68]",
            "    tst ip, #0x02",
            "    beq .Lwait_locka",
            "    ldr ip, [r0, #0x30]",
            "    bic ip, ip, #0x300",
            "    and r2, r2, #0x3",
            "    orr ip, ip, r2, lsl #8",
            "    str ip, [r0, #0x30]",
            ".Lwait_mckrdy:",
            "    ldr ip, [r0, #0x68]",
            "    tst ip, #0x08",
            "    beq .Lwait_mckrdy",
            "    bx lr",
            ".Lupdate_cpu_clock_end:",
            ".size __update_cpu_clock, . - __update_cpu_clock",
            "",
            ".section .rodata.__update_cpu_clock_sz,\"a\",%progbits",
            ".balign 4",
            ".global __update_cpu_clock_sz",
            "__update_cpu_clock_sz:",
            "    .word .Lupdate_cpu_clock_end - __update_cpu_clock",
        );

        extern "C" {
            static __update_cpu_clock: u8;
            static __update_cpu_clock_sz: u32;
        }
    }
}

/// The machine code of a clock-update routine, as an opaque byte image.
#[derive(Debug, Clone, Copy)]
pub struct ClockRoutine {
    image: &'static [u8],
}

impl ClockRoutine {
    /// The routine assembled into this crate.
    #[cfg(target_arch = "arm")]
    pub fn builtin() -> Self {
        // SAFETY: both symbols are defined by the `global_asm!` block above;
        // the size word is the distance between the routine's two labels.
        unsafe {
            let start = core::ptr::addr_of!(__update_cpu_clock);
            let len = core::ptr::read_volatile(core::ptr::addr_of!(__update_cpu_clock_sz)) as usize;
            Self {
                image: core::slice::from_raw_parts(start, len),
            }
        }
    }

    /// Wrap an externally assembled routine.
    ///
    /// The image must honour the calling convention and copy constraints
    /// documented at the module level.
    pub const fn from_image(image: &'static [u8]) -> Self {
        Self { image }
    }

    pub const fn image(&self) -> &'static [u8] {
        self.image
    }

    pub const fn len(&self) -> usize {
        self.image.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.image.is_empty()
    }
}
