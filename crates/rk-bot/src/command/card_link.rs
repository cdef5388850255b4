//! Card links: `pc <name>` links the sender, `pc del` unlinks and `pc` or
//! `pc show` shows the current link.

use super::Ctx;
use crate::effect::{Effect, PendingRoll};

pub(crate) fn run(ctx: &Ctx<'_>, args: &str) -> PendingRoll {
    let user = &ctx.request.user;
    let linked = ctx.cards.linked(&user.id);
    match args.trim() {
        "" | "show" => match linked {
            Some(name) => PendingRoll::reply(format!("{}当前使用的角色卡: {name}", user.name)),
            None => PendingRoll::reply(format!("{}没有绑定角色卡", user.name)),
        },
        "del" => match linked {
            Some(name) => PendingRoll::reply(format!("{}已解除绑定角色卡{name}", user.name))
                .with_effect(Effect::Unlink { user: user.id.clone() }),
            None => PendingRoll::reply(format!("{}没有绑定角色卡", user.name)),
        },
        name => {
            let name = &ctx.verbatim(name);
            if ctx.cards.card_by_name(name).is_none() {
                return PendingRoll::reply(format!("找不到角色卡{name}"));
            }
            PendingRoll::reply(format!("{}已绑定角色卡{name}", user.name)).with_effect(Effect::Link {
                user: user.id.clone(),
                card: name.to_string(),
            })
        }
    }
}
