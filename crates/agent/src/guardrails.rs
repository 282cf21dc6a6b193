use scudo_core::briefing::{ActionKind, ActionParams, ContextAction};
use scudo_core::errors::ApplicationError;

pub const DEFAULT_MAX_DISCOUNT_PERCENT: u8 = 30;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String, fallback_path: &'static str },
    Degrade { reason_code: &'static str, user_message: String, fallback_path: &'static str },
}

impl GuardrailDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Limits on side effects the assistant may trigger from a context action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionPolicy {
    pub email_enabled: bool,
    pub max_discount_percent: u8,
}

impl Default for ActionPolicy {
    fn default() -> Self {
        Self { email_enabled: true, max_discount_percent: DEFAULT_MAX_DISCOUNT_PERCENT }
    }
}

impl ActionPolicy {
    pub fn new(email_enabled: bool, max_discount_percent: u8) -> Result<Self, ApplicationError> {
        let policy = Self { email_enabled, max_discount_percent };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), ApplicationError> {
        if self.max_discount_percent > 100 {
            return Err(ApplicationError::PolicyViolation(format!(
                "max_discount_percent must be within 0..=100, got {}",
                self.max_discount_percent
            )));
        }
        Ok(())
    }

    pub fn evaluate(&self, action: &ContextAction) -> GuardrailDecision {
        match (&action.action, &action.params) {
            (ActionKind::SendEmail, _) if !self.email_enabled => GuardrailDecision::Degrade {
                reason_code: "email_disabled",
                user_message: "Email sending is turned off. Reach out to the customer directly."
                    .to_string(),
                fallback_path: "manual_outreach",
            },
            (ActionKind::SendEmail, ActionParams::Email(params))
                if params.customer_email.trim().is_empty() =>
            {
                GuardrailDecision::Deny {
                    reason_code: "missing_recipient",
                    user_message: format!(
                        "Customer {} has no email address on file.",
                        params.customer_id
                    ),
                    fallback_path: "manual_outreach",
                }
            }
            (ActionKind::SendEmail, ActionParams::Email(_)) => GuardrailDecision::Allow,
            (ActionKind::CreatePromotion, ActionParams::Promotion(params))
                if params.discount_percent > self.max_discount_percent =>
            {
                GuardrailDecision::Deny {
                    reason_code: "discount_above_limit",
                    user_message: format!(
                        "A {}% discount exceeds the {}% limit for assistant-created promotions.",
                        params.discount_percent, self.max_discount_percent
                    ),
                    fallback_path: "approval_workflow",
                }
            }
            (ActionKind::CreatePromotion, ActionParams::Promotion(_)) => GuardrailDecision::Allow,
            (ActionKind::ShowCustomerSegments, _) | (ActionKind::ProcessDataRequest, _) => {
                GuardrailDecision::Allow
            }
            (kind, _) => GuardrailDecision::Deny {
                reason_code: "mismatched_params",
                user_message: format!("The {} action is missing its parameters.", kind.as_str()),
                fallback_path: "request_explicit_action",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use scudo_core::briefing::{
        ActionKind, ActionParams, ContextAction, NoParams, Opportunity, OpportunityKind, Priority,
        UrgentCustomer,
    };

    use super::{ActionPolicy, GuardrailDecision};

    fn urgent(email: &str) -> UrgentCustomer {
        UrgentCustomer {
            id: "c-1".to_string(),
            name: "Dana".to_string(),
            email: email.to_string(),
            risk: 0.9,
            value: 1200.0,
            segment: "VIP".to_string(),
        }
    }

    fn premium_campaign() -> ContextAction {
        ContextAction::segment_campaign(&Opportunity {
            kind: OpportunityKind::Premium,
            segment: "VIP".to_string(),
            count: 2,
            potential_revenue: 1500.0,
        })
    }

    #[test]
    fn retention_email_allowed_by_default() {
        let decision = ActionPolicy::default().evaluate(&ContextAction::retention_email(&urgent("d@x.io")));
        assert_eq!(decision, GuardrailDecision::Allow);
    }

    #[test]
    fn disabled_email_degrades_to_manual_outreach() {
        let policy = ActionPolicy { email_enabled: false, ..ActionPolicy::default() };
        let decision = policy.evaluate(&ContextAction::retention_email(&urgent("d@x.io")));

        let (reason_code, fallback_path) = match decision {
            GuardrailDecision::Degrade { reason_code, fallback_path, .. } => (reason_code, fallback_path),
            _ => ("", ""),
        };
        assert_eq!(reason_code, "email_disabled");
        assert_eq!(fallback_path, "manual_outreach");
    }

    #[test]
    fn blank_recipient_is_denied() {
        let decision = ActionPolicy::default().evaluate(&ContextAction::retention_email(&urgent("")));
        assert!(matches!(decision, GuardrailDecision::Deny { reason_code: "missing_recipient", .. }));
    }

    #[test]
    fn discount_above_limit_is_denied() {
        let policy = ActionPolicy::new(true, 5).expect("valid policy");
        let decision = policy.evaluate(&premium_campaign());

        let user_message = match decision {
            GuardrailDecision::Deny { reason_code: "discount_above_limit", user_message, .. } => {
                user_message
            }
            _ => String::new(),
        };
        assert!(user_message.contains("10% discount exceeds the 5% limit"));
    }

    #[test]
    fn mismatched_params_are_denied() {
        let action = ContextAction {
            label: "Create campaign".to_string(),
            action: ActionKind::CreatePromotion,
            params: ActionParams::None(NoParams::default()),
            priority: Priority::High,
        };
        let decision = ActionPolicy::default().evaluate(&action);
        assert!(matches!(decision, GuardrailDecision::Deny { reason_code: "mismatched_params", .. }));
    }

    #[test]
    fn discount_limit_must_be_a_percentage() {
        assert!(ActionPolicy::new(true, 100).is_ok());
        assert!(ActionPolicy::new(true, 101).is_err());
        assert!(ActionPolicy::default().evaluate(&ContextAction::view_analytics()).is_allowed());
    }
}
