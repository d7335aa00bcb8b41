fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // ESP-IDF builds need the sysenv exported by embuild; host builds
    // (tests, bench simulation) skip it entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
