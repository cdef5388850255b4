use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rk_bot::{PendingRoll, RollRequest, RollResult, UserInfo};

pub struct RollArgs<'a> {
    pub command: &'a str,
    pub cards: &'a Path,
    pub config: Option<&'a Path>,
    pub user: &'a str,
    pub name: Option<&'a str>,
    pub manager: bool,
    pub mentions: &'a [String],
    pub seed: Option<u64>,
    pub dry_run: bool,
}

pub fn run(args: &RollArgs<'_>) -> Result<(), String> {
    let dispatcher = super::load_config(args.config)?.compile();
    let mut cards = super::load_cards(args.cards, dispatcher.registry())?;
    let mut channel = dispatcher.channel_state();
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut user = UserInfo::new(args.user, args.name.unwrap_or(args.user));
    user.is_manager = args.manager;
    let request = args
        .mentions
        .iter()
        .fold(RollRequest::new(user), |r, id| r.with_mention(id.as_str()));

    let pending = dispatcher
        .dispatch(args.command, &request, &cards, &channel, &mut rng)
        .ok_or_else(|| "command abandoned (set RUST_LOG=debug for details)".to_string())?;
    if args.dry_run {
        print_pending(&pending);
        return Ok(());
    }

    // Links change the card file without changing a card.
    let writes = !pending.effects.is_empty();
    let result = pending.apply(&mut cards, &mut channel);
    print_result(&result);
    if writes {
        super::save_cards(args.cards, &cards)?;
        tracing::debug!(path = %args.cards.display(), "card file updated");
    }
    Ok(())
}

fn print_result(result: &RollResult) {
    println!("{}", result.output);
    if let Some(private) = &result.private_output {
        println!("[private] {private}");
    }
}

fn print_pending(pending: &PendingRoll) {
    println!("{}", pending.output);
    if let Some(private) = &pending.private_output {
        println!("[private] {private}");
    }
    for effect in &pending.effects {
        println!("[dry run] would apply {effect:?}");
    }
}
