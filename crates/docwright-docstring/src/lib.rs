//! Sanitizer (C11), Verifier (C12), and docstring rendering. Grounded
//! on the original `sanitize.py`/`verify.py`/`formatter.py`.

pub mod render;
pub mod sanitize;
pub mod verify;

pub use render::render_docstring;
pub use sanitize::sanitize;
pub use verify::{VerifyReport, parse_param_names, verify};
