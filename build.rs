fn main() {
    println!("cargo:rerun-if-changed=sdkconfig.defaults");

    // Host builds (tests, simulation) have no ESP-IDF environment to export.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
