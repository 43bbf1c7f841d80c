use std::env;

const DEFAULT_F_CPU: &str = "16000000";

fn main() {
    println!("cargo:rerun-if-env-changed=F_CPU");

    // Pass CPU frequency for timing calculations
    let f_cpu = env::var("F_CPU").unwrap_or_else(|_| DEFAULT_F_CPU.to_string());
    if f_cpu.is_empty() || !f_cpu.bytes().all(|b| b.is_ascii_digit()) {
        panic!("F_CPU must be a decimal frequency in Hz, got {:?}", f_cpu);
    }
    println!("cargo:rustc-env=MCU_FREQ_HZ={}", f_cpu);

    let target = env::var("TARGET").unwrap_or_default();
    if target.contains("avr") {
        println!("cargo:warning=Building pulse timing for AVR at {} Hz", f_cpu);
    }
}
