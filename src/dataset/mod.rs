pub mod xor;
