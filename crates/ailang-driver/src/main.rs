//! A placeholder binary. The CLI shell — argument parsing, source file
//! loading, diagnostic report rendering — is out of scope here (§1): this
//! workspace has no parser, so there is no `File` for a real CLI to build
//! except by hand. Embedders drive [`ailang_driver::Session`] directly.

fn main() {
    eprintln!("ailangc: no CLI frontend in this build; embed ailang_driver::Session instead");
    std::process::exit(1);
}
