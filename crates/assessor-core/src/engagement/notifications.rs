//! Notification planning for missions, check-ins and open loops.

use serde::{Deserialize, Serialize};

use crate::engagement::checkins::CheckInPlan;
use crate::engagement::missions::MicroMission;
use crate::engagement::triggers::CheckInSlot;
use crate::engagement::zeigarnik::ZeigarnikHook;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSchedule {
    Immediate,
    NextBlock,
    Weekly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPlan {
    pub title: String,
    pub body: String,
    pub schedule: NotificationSchedule,
}

/// Plans in insertion order: missions, then check-ins, then the first hook.
pub fn build_notifications(
    check_ins: &[CheckInPlan],
    missions: &[MicroMission],
    hooks: &[ZeigarnikHook],
) -> Vec<NotificationPlan> {
    let mission_plans = missions.iter().map(|mission| NotificationPlan {
        title: "Micro missão pronta".to_string(),
        body: format!("{} — recompensa: {}", mission.description, mission.reward),
        schedule: NotificationSchedule::Immediate,
    });

    let check_in_plans = check_ins.iter().map(|check_in| NotificationPlan {
        title: format!("Check-in {}", check_in.scope.as_str()),
        body: check_in.prompt.clone(),
        schedule: if check_in.slot == CheckInSlot::Weekly {
            NotificationSchedule::Weekly
        } else {
            NotificationSchedule::NextBlock
        },
    });

    let hook_plan = hooks.first().map(|hook| NotificationPlan {
        title: "Retome de onde parou".to_string(),
        body: hook.reminder.clone(),
        schedule: NotificationSchedule::Immediate,
    });

    mission_plans
        .chain(check_in_plans)
        .chain(hook_plan)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::checkins::plan_check_ins;
    use crate::engagement::missions::{build_mission, MissionHints};

    fn hook(text: &str) -> ZeigarnikHook {
        ZeigarnikHook {
            mission_id: None,
            reminder: text.to_string(),
            next_step: String::new(),
        }
    }

    #[test]
    fn test_order_and_schedules() {
        let mission = build_mission(&MissionHints::default(), 0);
        let check_ins = plan_check_ins(Some(CheckInSlot::Weekly), 1);
        let plans = build_notifications(&check_ins, &[mission.clone()], &[hook("a"), hook("b")]);

        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0].title, "Micro missão pronta");
        assert_eq!(
            plans[0].body,
            format!("{} — recompensa: emoji surpresa", mission.description)
        );
        assert_eq!(plans[0].schedule, NotificationSchedule::Immediate);
        assert_eq!(plans[1].title, "Check-in semana");
        assert_eq!(plans[1].schedule, NotificationSchedule::Weekly);
        assert_eq!(plans[2].body, "a");
    }

    #[test]
    fn test_daily_check_in_goes_to_next_block() {
        let plans = build_notifications(&plan_check_ins(Some(CheckInSlot::Morning), 0), &[], &[]);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].title, "Check-in dia");
        assert_eq!(plans[0].schedule, NotificationSchedule::NextBlock);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(build_notifications(&[], &[], &[]).is_empty());
    }
}
