pub mod compression;
pub mod permissions;
pub mod picker;
pub mod qr;
pub mod share;
pub mod storage;
