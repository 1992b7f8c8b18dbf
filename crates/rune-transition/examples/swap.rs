/// Drive a single-child swap frame by frame and print what a renderer would draw.
///
/// Run with: RUST_LOG=rune_transition=trace cargo run -p rune-transition --example swap

use rune_transition::{Hooks, PhaseContext, RuneConfig, TransitionGroup};

fn main() -> anyhow::Result<()> {
    let _ = env_logger::try_init();

    let config = RuneConfig::load();
    let hooks = Hooks::new()
        .on_enter_complete(|cx: &PhaseContext<'_>, _: &&'static str| {
            println!("  [{:>5.0}ms] {} settled", cx.now_ms, cx.key);
        })
        .on_exit_complete(|cx: &PhaseContext<'_>, _: &&'static str| {
            println!("  [{:>5.0}ms] {} removed", cx.now_ms, cx.key);
        });

    let mut group = TransitionGroup::new(config.transitions, hooks)
        .with_environment(config.environment);

    group.update(vec!["home"])?;
    print_frame(&group);

    group.update(vec!["settings"])?;
    print_frame(&group);

    while !group.is_idle() {
        group.tick(16.0);
        print_frame(&group);
    }
    Ok(())
}

fn print_frame<H>(group: &TransitionGroup<&'static str, H>)
where
    H: rune_transition::TransitionHooks<&'static str>,
{
    let line: Vec<String> = group
        .rendered()
        .iter()
        .map(|r| {
            let attrs: Vec<&str> = r.markers.attributes().collect();
            format!("{}[{}]", r.key, attrs.join(" "))
        })
        .collect();
    println!("{:>6.0}ms  {}", group.now_ms(), line.join("  "));
}
