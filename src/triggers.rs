use alloc::{string::ToString, vec::Vec};

use snafu::OptionExt;

use crate::error::{MotionError, UnknownTriggerSnafu};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TriggerCondition {
    /// Fires once the absolute travelled distance reaches this many metres.
    Distance(f64),
    /// Fires once this tick has been commanded.
    Tick(usize),
}

impl TriggerCondition {
    /// Whether `progress` satisfies this condition. A distance condition
    /// never matches tick progress and vice versa.
    pub fn is_met(&self, progress: Progress) -> bool {
        match (*self, progress) {
            (Self::Distance(at), Progress::Distance(travelled)) => libm::fabs(travelled) >= at,
            (Self::Tick(at), Progress::Tick(tick)) => tick >= at,
            _ => false,
        }
    }
}

/// How far a move has got, in one of the units a condition can use.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Progress {
    Distance(f64),
    Tick(usize),
}

pub struct TriggerDefinition<A: 'static> {
    pub name: &'static str,
    pub actions: &'static [A],
}

struct Armed<A: 'static> {
    condition: TriggerCondition,
    actions: &'static [A],
}

/// Named action lists armed against playback progress. Each armed trigger
/// fires at most once.
pub struct TriggerManager<A: 'static> {
    definitions: &'static [TriggerDefinition<A>],
    pending: Vec<Armed<A>>,
}

impl<A: Copy + 'static> TriggerManager<A> {
    pub fn new(definitions: &'static [TriggerDefinition<A>]) -> Self {
        Self {
            definitions,
            pending: Vec::new(),
        }
    }

    fn actions_for(&self, name: &str) -> Result<&'static [A], MotionError> {
        let definition = self
            .definitions
            .iter()
            .find(|definition| definition.name == name)
            .context(UnknownTriggerSnafu {
                name: name.to_string(),
            })?;
        Ok(definition.actions)
    }

    pub fn arm(&mut self, condition: TriggerCondition, name: &str) -> Result<(), MotionError> {
        let actions = self.actions_for(name)?;
        self.pending.push(Armed { condition, actions });
        Ok(())
    }

    pub fn armed(&self) -> usize {
        self.pending.len()
    }

    /// Forgets every armed trigger that has not fired yet.
    pub fn disarm_all(&mut self) {
        self.pending.clear();
    }

    /// Removes every armed trigger `progress` satisfies and returns their
    /// actions in arming order.
    pub fn fire(&mut self, progress: Progress) -> Vec<A> {
        let mut fired = Vec::new();
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].condition.is_met(progress) {
                fired.extend_from_slice(self.pending.remove(index).actions);
            } else {
                index += 1;
            }
        }
        fired
    }

    pub fn check_distance(&mut self, travelled: f64) -> Vec<A> {
        self.fire(Progress::Distance(travelled))
    }

    pub fn check_tick(&mut self, tick: usize) -> Vec<A> {
        self.fire(Progress::Tick(tick))
    }

    pub fn trigger_now(&self, name: &str) -> Result<Vec<A>, MotionError> {
        Ok(self.actions_for(name)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq)]
    enum Act {
        Intake(f64),
        Tray(f64),
    }

    static DEFS: &[TriggerDefinition<Act>] = &[
        TriggerDefinition {
            name: "grab",
            actions: &[Act::Intake(200.0)],
        },
        TriggerDefinition {
            name: "stack",
            actions: &[Act::Intake(0.0), Act::Tray(50.0)],
        },
    ];

    #[test]
    fn distance_trigger_fires_once_on_magnitude() {
        let mut triggers = TriggerManager::new(DEFS);
        triggers.arm(TriggerCondition::Distance(0.5), "stack").unwrap();
        assert!(triggers.check_distance(0.49).is_empty());
        assert_eq!(
            triggers.check_distance(-0.5),
            [Act::Intake(0.0), Act::Tray(50.0)]
        );
        assert!(triggers.check_distance(1.0).is_empty());
        assert_eq!(triggers.armed(), 0);
    }

    #[test]
    fn tick_triggers_fire_in_order() {
        let mut triggers = TriggerManager::new(DEFS);
        triggers.arm(TriggerCondition::Tick(3), "grab").unwrap();
        triggers.arm(TriggerCondition::Tick(1), "stack").unwrap();
        assert_eq!(triggers.check_tick(1), [Act::Intake(0.0), Act::Tray(50.0)]);
        assert!(triggers.check_tick(2).is_empty());
        assert_eq!(triggers.check_tick(7), [Act::Intake(200.0)]);
    }

    #[test]
    fn conditions_only_match_their_own_kind() {
        assert!(TriggerCondition::Distance(0.4).is_met(Progress::Distance(-0.4)));
        assert!(!TriggerCondition::Distance(0.4).is_met(Progress::Tick(1000)));
        assert!(!TriggerCondition::Tick(5).is_met(Progress::Distance(5.0)));
        assert!(TriggerCondition::Tick(5).is_met(Progress::Tick(6)));
    }

    #[test]
    fn mixed_triggers_leave_the_other_kind_armed() {
        let mut triggers = TriggerManager::new(DEFS);
        triggers.arm(TriggerCondition::Distance(0.2), "grab").unwrap();
        triggers.arm(TriggerCondition::Tick(2), "stack").unwrap();
        assert_eq!(triggers.fire(Progress::Tick(4)), [Act::Intake(0.0), Act::Tray(50.0)]);
        assert_eq!(triggers.armed(), 1);
        assert_eq!(triggers.fire(Progress::Distance(0.3)), [Act::Intake(200.0)]);
        triggers.arm(TriggerCondition::Tick(9), "grab").unwrap();
        triggers.disarm_all();
        assert!(triggers.fire(Progress::Tick(10)).is_empty());
    }

    #[test]
    fn unknown_name_is_an_error() {
        let mut triggers = TriggerManager::new(DEFS);
        assert!(matches!(
            triggers.arm(TriggerCondition::Tick(0), "dance"),
            Err(MotionError::UnknownTrigger { .. })
        ));
        assert_eq!(triggers.trigger_now("grab").unwrap(), [Act::Intake(200.0)]);
    }
}
