mod error;
pub use error::{CryptError, CryptResult};

mod jwt;
pub use jwt::{UserClaims, generate_token, process_token};

mod password;
pub use password::{hash_password, verify_password};
