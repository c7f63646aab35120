fn main() {
    // Propagates ESP-IDF cfg flags when building for the device target.
    // No-op on host builds (the sysenv variables are simply absent).
    embuild::espidf::sysenv::output();
}
