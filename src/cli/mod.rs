//! # CLI Module
//!
//! `specgate` subcommands:
//!
//! ```bash
//! # serve any document; every operation echoes its validated input
//! specgate serve --spec doc/pets.yaml --route /api --addr 127.0.0.1:8080
//!
//! # print METHOD route -> controller#method
//! specgate routes --spec doc/pets.yaml
//!
//! # exit non-zero when the document does not compile
//! specgate check --config gateway.yaml
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{format_route, run, run_cli, Cli, Commands, SpecArgs};
