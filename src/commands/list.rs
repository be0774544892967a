//! List commands implementation

use mdioctl_driver::DriverRegistry;

/// List the transports enabled at compile time
pub fn list_drivers(details: bool) {
    let registry = DriverRegistry::with_builtin();

    if details {
        print!("{}", registry.help());
        return;
    }

    println!("Supported drivers:");
    println!();
    for name in registry.list() {
        if let Some(info) = registry.get(name) {
            println!("  {:<9} - {}", name, info.description);
        }
    }
}
