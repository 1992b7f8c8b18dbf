/// Example program to print the loaded transition configuration
///
/// Run with: cargo run -p rune-config --example print_config

fn main() {
    let config = rune_config::RuneConfig::load();

    println!("=== Rune Transition Configuration ===\n");

    println!("Environment: {:?}", config.environment);
    println!("  Usage checks: {}", config.environment.checks_usage());
    println!();

    println!("Transitions:");
    println!("  Enter duration: {}ms", config.transitions.enter_duration_ms);
    println!("  Exit duration: {}ms", config.transitions.exit_duration_ms);
    println!(
        "  Prevent initial transition: {}",
        config.transitions.prevent_initial_transition
    );
    println!("  Mount delay: {:?}", config.transitions.enter_mount_delay_ms);
    println!("  Insert policy: {:?}", config.transitions.insert_policy);
    println!(
        "  Animations disabled: {}",
        config.transitions.animations_disabled(config.environment)
    );
    println!();

    println!("Layout:");
    println!("  Dimension: {}", config.layout.dimension.as_str());
    println!("  Item anchor: {:?}", config.layout.item_anchor);
    println!("  Move grace window: {}ms", config.layout.move_grace_ms);
}
