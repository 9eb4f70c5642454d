use crate::action::ActionError;
use crate::action::effect::{Effect, HealEffect, ItemConsumedEffect};
use crate::action::resolve::Resolver;
use crate::battle::Resource;
use crate::content::ItemEffect;
use crate::state::EntityId;

/// Administers a consumable to `target`, possibly the user.
pub(super) fn resolve(
    r: &mut Resolver<'_>,
    source: EntityId,
    item_name: &str,
    target: EntityId,
) -> Result<Vec<Effect>, ActionError> {
    let user = r.actor(source)?;
    if user.inventory().count(item_name) == 0 {
        return Err(ActionError::ItemMissing {
            entity: source,
            item: item_name.to_owned(),
        });
    }
    let item = r.content.item(item_name)?;
    r.require(source, Resource::Action)?;
    r.living(target)?;
    if r.hostile(source, target) {
        return Err(ActionError::InvalidTarget {
            target,
            reason: "items can only be given to allies",
        });
    }
    r.within(source, target, item.range_ft)?;

    let mut effects = Vec::with_capacity(2);
    match &item.effect {
        ItemEffect::Heal { amount } => {
            let roll = amount.roll(r.dice);
            effects.push(Effect::Heal(HealEffect {
                source,
                target,
                origin: item.name.clone(),
                amount: roll.result().max(0),
                roll,
            }));
        }
    }
    effects.push(Effect::ItemConsumed(ItemConsumedEffect {
        entity: source,
        item: item_name.to_owned(),
    }));
    Ok(effects)
}
