// Identity module - wallet addresses, secp256k1 keys and signed sign-in

mod address;
mod keypair;
mod login;
mod signer;

pub use address::*;
pub use keypair::*;
pub use login::*;
pub use signer::*;
