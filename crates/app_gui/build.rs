use std::env;

fn main() {
    let version =
        env::var("FRUITSCAN_VERSION").unwrap_or_else(|_| env::var("CARGO_PKG_VERSION").unwrap());
    println!("cargo:rustc-env=FRUITSCAN_VERSION={version}");
}
