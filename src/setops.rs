//! Applies set operators (`k p rr ro ra e mi ma`) against selectors.
//!
//! Selection works on absolute indices into the member list, restricted to
//! members that are still kept; `h`/`l` break ties toward the earlier index.
//! Operators within one suffix chain apply left to right, each seeing the
//! previous one's result.

use crate::error::RollError;
use crate::eval::RollContext;
use crate::ops::{Int, SetOperator, SetOperatorKind, SetSelector, Val};
use crate::rng::DieRoller;
use crate::tree::{Dice, Number, NumberKind, NumberTrait, Parenthetical, Set};
use std::collections::BTreeSet;

impl SetOperator {
    pub(crate) fn operate_on_set(&self, target: &mut Set) -> crate::Result<()> {
        match self.kind {
            SetOperatorKind::Keep => keep(self, &mut target.values),
            SetOperatorKind::Drop => drop_selected(self, &mut target.values),
            kind => Err(dice_only(kind)),
        }
    }

    /// A parenthetical delegates to whatever it wraps, so keep/drop on
    /// `(10d6kh5)` reaches the dice; any other inner value acts as a
    /// one-member set.
    pub(crate) fn operate_on_parenthetical(
        &self,
        target: &mut Parenthetical,
    ) -> crate::Result<()> {
        operate_inner(self, &mut target.value)
    }

    pub(crate) fn operate_on_dice<R: DieRoller>(
        &self,
        target: &mut Dice,
        ctx: &mut RollContext<R>,
    ) -> crate::Result<()> {
        match self.kind {
            SetOperatorKind::Keep => keep(self, &mut target.values),
            SetOperatorKind::Drop => drop_selected(self, &mut target.values),
            SetOperatorKind::Reroll => reroll(self, target, ctx),
            SetOperatorKind::RerollOnce => reroll_once(self, target, ctx),
            SetOperatorKind::Explode => explode(self, target, ctx),
            SetOperatorKind::RerollAdd => reroll_add(self, target, ctx),
            SetOperatorKind::Minimum => minimum(self, target),
            SetOperatorKind::Maximum => maximum(self, target),
        }
    }
}

fn operate_inner(op: &SetOperator, value: &mut Number) -> crate::Result<()> {
    match &mut value.kind {
        NumberKind::Dice(dice) => match op.kind {
            SetOperatorKind::Keep => keep(op, &mut dice.values),
            SetOperatorKind::Drop => drop_selected(op, &mut dice.values),
            kind => Err(dice_only(kind)),
        },
        NumberKind::Set(set) => op.operate_on_set(set),
        NumberKind::Parenthetical(inner) => operate_inner(op, &mut inner.value),
        _ => match op.kind {
            SetOperatorKind::Keep => keep(op, std::slice::from_mut(value)),
            SetOperatorKind::Drop => drop_selected(op, std::slice::from_mut(value)),
            kind => Err(dice_only(kind)),
        },
    }
}

fn dice_only(kind: SetOperatorKind) -> RollError {
    RollError::value_error(format!("the '{}' operator can only be used on dice", kind))
}

/// Union of the operator's selectors over the currently kept members.
fn select<T: NumberTrait>(
    op: &SetOperator,
    members: &[T],
    max_targets: Option<usize>,
) -> crate::Result<BTreeSet<usize>> {
    let mut out = BTreeSet::new();
    for sel in &op.sels {
        let batch_max = match max_targets {
            Some(max) => {
                let remaining = max - out.len();
                if remaining == 0 {
                    break;
                }
                Some(remaining)
            }
            None => None,
        };
        out.extend(sel.select(members, batch_max)?);
    }
    Ok(out)
}

impl SetSelector {
    pub(crate) fn select<T: NumberTrait>(
        &self,
        members: &[T],
        max_targets: Option<usize>,
    ) -> crate::Result<Vec<usize>> {
        let mut kept: Vec<(usize, Val)> = Vec::new();
        for (i, member) in members.iter().enumerate() {
            if member.kept() {
                kept.push((i, member.total()?));
            }
        }

        let mut selected: Vec<usize> = match *self {
            Self::Highest(n) => {
                kept.sort_by(|(_, x), (_, y)| y.partial_cmp(x).unwrap());
                kept.iter().take(n.max(0) as usize).map(|&(i, _)| i).collect()
            }
            Self::Lowest(n) => {
                kept.sort_by(|(_, x), (_, y)| x.partial_cmp(y).unwrap());
                kept.iter().take(n.max(0) as usize).map(|&(i, _)| i).collect()
            }
            Self::GreaterThan(x) => filter_by(&kept, |v| v > Val::Int(x)),
            Self::LessThan(x) => filter_by(&kept, |v| v < Val::Int(x)),
            Self::EqualTo(x) => filter_by(&kept, |v| v == Val::Int(x)),
        };

        if let Some(max) = max_targets {
            selected.truncate(max);
        }
        Ok(selected)
    }
}

fn filter_by(kept: &[(usize, Val)], pred: impl Fn(Val) -> bool) -> Vec<usize> {
    kept.iter()
        .filter(|&&(_, v)| pred(v))
        .map(|&(i, _)| i)
        .collect()
}

fn keep<T: NumberTrait>(op: &SetOperator, members: &mut [T]) -> crate::Result<()> {
    let to_keep = select(op, members, None)?;
    for (i, member) in members.iter_mut().enumerate() {
        if member.kept() && !to_keep.contains(&i) {
            member.drop();
        }
    }
    Ok(())
}

fn drop_selected<T: NumberTrait>(op: &SetOperator, members: &mut [T]) -> crate::Result<()> {
    for i in select(op, members, None)? {
        members[i].drop();
    }
    Ok(())
}

fn reroll<R: DieRoller>(
    op: &SetOperator,
    target: &mut Dice,
    ctx: &mut RollContext<R>,
) -> crate::Result<()> {
    // Re-selects after every pass; the roll budget bounds always-matching
    // conditions like d1rr1.
    let mut to_reroll = select(op, &target.values, None)?;
    while !to_reroll.is_empty() {
        for &i in &to_reroll {
            target.values[i].reroll(ctx)?;
        }
        to_reroll = select(op, &target.values, None)?;
    }
    Ok(())
}

fn reroll_once<R: DieRoller>(
    op: &SetOperator,
    target: &mut Dice,
    ctx: &mut RollContext<R>,
) -> crate::Result<()> {
    for i in select(op, &target.values, None)? {
        target.values[i].reroll(ctx)?;
    }
    Ok(())
}

fn explode<R: DieRoller>(
    op: &SetOperator,
    target: &mut Dice,
    ctx: &mut RollContext<R>,
) -> crate::Result<()> {
    let mut to_explode = select(op, &target.values, None)?;
    let mut already_exploded = BTreeSet::new();

    while !to_explode.is_empty() {
        for &i in &to_explode {
            target.values[i].explode();
            target.roll_another(ctx)?;
        }
        already_exploded.extend(to_explode);
        to_explode = select(op, &target.values, None)?
            .difference(&already_exploded)
            .copied()
            .collect();
    }
    Ok(())
}

/// `ra`: at most one matched die explodes, once; the original face stays.
fn reroll_add<R: DieRoller>(
    op: &SetOperator,
    target: &mut Dice,
    ctx: &mut RollContext<R>,
) -> crate::Result<()> {
    for i in select(op, &target.values, Some(1))? {
        target.values[i].explode();
        target.roll_another(ctx)?;
    }
    Ok(())
}

fn clamp_value(op: &SetOperator, what: &str) -> crate::Result<Int> {
    match op.sels.last() {
        Some(SetSelector::EqualTo(n)) => Ok(*n),
        Some(sel) => Err(RollError::value_error(format!(
            "{} is not a valid selector for {}",
            sel, what
        ))),
        None => Err(RollError::value_error(format!(
            "missing selector for {}",
            what
        ))),
    }
}

fn minimum(op: &SetOperator, target: &mut Dice) -> crate::Result<()> {
    let the_min = clamp_value(op, "minimums")?;
    for die in target.values.iter_mut().filter(|d| d.kept) {
        if die.number()?.as_int() < the_min {
            die.force_value(the_min);
        }
    }
    Ok(())
}

fn maximum(op: &SetOperator, target: &mut Dice) -> crate::Result<()> {
    let the_max = clamp_value(op, "maximums")?;
    for die in target.values.iter_mut().filter(|d| d.kept) {
        if die.number()?.as_int() > the_max {
            die.force_value(the_max);
        }
    }
    Ok(())
}
