//! Interest flags for socket registration.

/// Bitwise union of interest flags.
pub type SockOps = u32;

/// Reserved scheduling hint carried with each registration. Dispatch ignores it.
pub type Priority = i32;

pub const DEFAULT_PRIORITY: Priority = 0;

pub const READ: SockOps = 0x01;
pub const WRITE: SockOps = 0x02;
pub const OOB: SockOps = 0x04;
pub const ACCEPT: SockOps = 0x08;
pub const CONNECT: SockOps = 0x10;
pub const CLOSE: SockOps = 0x20;
/// Ask to be called back with this flag when the mask drops to zero.
pub const UNREGISTER: SockOps = 0x40;
pub const ALL: SockOps = READ | WRITE | OOB | ACCEPT | CONNECT | CLOSE | UNREGISTER;

pub const READ_BITS: SockOps = READ | ACCEPT | CLOSE;
pub const WRITE_BITS: SockOps = WRITE | CONNECT;
pub const EXCEPT_BITS: SockOps = OOB;

/// Readiness groups, in dispatch order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Group {
    Except,
    Write,
    Read,
}

impl Group {
    pub const DISPATCH_ORDER: [Group; 3] = [Group::Except, Group::Write, Group::Read];

    pub fn bits(self) -> SockOps {
        match self {
            Group::Read => READ_BITS,
            Group::Write => WRITE_BITS,
            Group::Except => EXCEPT_BITS,
        }
    }

    /// Flag reported when the registered mask no longer names this group.
    pub fn primary(self) -> SockOps {
        match self {
            Group::Read => READ,
            Group::Write => WRITE,
            Group::Except => OOB,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Group::Read => "read",
            Group::Write => "write",
            Group::Except => "except",
        }
    }
}

pub fn mask_has(mask: SockOps, bits: SockOps) -> bool {
    mask & bits != 0
}
