#[cfg(feature = "csr")]
fn main() {
    kcloft_app::browser::start();
}

#[cfg(not(feature = "csr"))]
fn main() {
    // The front end only runs in the browser; build with `--features csr`.
}
