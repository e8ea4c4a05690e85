//! Cron-driven appointment reminders over WhatsApp

use chrono::{Duration, Local, NaiveDateTime, Utc};
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::config::Config;
use crate::db::Database;
use crate::models::{DueReminder, MessageDirection};
use crate::services::clients::normalize_phone;
use crate::whatsapp::WhatsAppMessenger;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub reminder_cron: String,
    pub lead_hours: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reminder_cron: "0 */10 * * * *".to_string(),
            lead_hours: 24,
        }
    }
}

impl From<&Config> for SchedulerConfig {
    fn from(config: &Config) -> Self {
        Self {
            reminder_cron: config.reminder_cron.clone(),
            lead_hours: config.reminder_lead_hours,
        }
    }
}

pub struct Scheduler {
    db: Arc<Database>,
    messenger: Option<Arc<dyn WhatsAppMessenger>>,
    schedule: Schedule,
    lead: Duration,
}

impl Scheduler {
    pub fn new(
        db: Arc<Database>,
        messenger: Option<Arc<dyn WhatsAppMessenger>>,
        config: SchedulerConfig,
    ) -> Result<Self, String> {
        let schedule = Schedule::from_str(&config.reminder_cron)
            .map_err(|e| format!("Invalid reminder cron '{}': {}", config.reminder_cron, e))?;
        if config.lead_hours <= 0 {
            return Err("Reminder lead time must be at least one hour".to_string());
        }
        Ok(Self {
            db,
            messenger,
            schedule,
            lead: Duration::hours(config.lead_hours),
        })
    }

    /// Run until `shutdown` fires, scanning for reminders on every cron tick
    pub async fn start(&self, mut shutdown: oneshot::Receiver<()>) {
        if self.messenger.is_none() {
            log::warn!("[SCHEDULER] WhatsApp is not configured, reminders are disabled");
        }

        loop {
            let Some(next) = self.schedule.upcoming(Utc).next() else {
                log::warn!("[SCHEDULER] Reminder schedule has no upcoming runs, stopping");
                return;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or_default();

            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("[SCHEDULER] Shutting down");
                    return;
                }
                _ = tokio::time::sleep(wait) => {
                    let sent = self.run_reminders(Local::now().naive_local()).await;
                    if sent > 0 {
                        log::info!("[SCHEDULER] Sent {} appointment reminder(s)", sent);
                    }
                }
            }
        }
    }

    /// Send reminders for confirmed appointments starting within the lead
    /// window. Returns how many went out.
    pub async fn run_reminders(&self, now: NaiveDateTime) -> usize {
        let Some(messenger) = self.messenger.as_deref() else {
            return 0;
        };
        let due = match self.db.due_reminders(now, now + self.lead) {
            Ok(due) => due,
            Err(e) => {
                log::error!("[SCHEDULER] Failed to load due reminders: {}", e);
                return 0;
            }
        };

        let mut sent = 0;
        for reminder in &due {
            match self.send_reminder(messenger, reminder).await {
                Ok(()) => sent += 1,
                Err(e) => log::warn!(
                    "[SCHEDULER] Reminder for appointment {} failed: {}",
                    reminder.appointment_id,
                    e
                ),
            }
        }
        sent
    }

    async fn send_reminder(&self, messenger: &dyn WhatsAppMessenger, reminder: &DueReminder) -> Result<(), String> {
        let phone = normalize_phone(&reminder.client_phone);
        let body = reminder_text(reminder);
        let wa_id = messenger.send_text(&reminder.phone_number_id, &phone, &body).await?;

        self.db
            .mark_reminder_sent(reminder.appointment_id)
            .map_err(|e| e.to_string())?;
        let conversation = self
            .db
            .upsert_conversation(reminder.business_id, &phone, Some(&reminder.client_name))
            .map_err(|e| e.to_string())?;
        self.db
            .insert_whatsapp_message(conversation.id, MessageDirection::Outbound, "text", &body, Some(&wa_id))
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

pub fn reminder_text(reminder: &DueReminder) -> String {
    format!(
        "Hola {}, te recordamos tu cita de {} con {} en {} el {} a las {}. Si no puedes asistir, respóndenos a este mensaje.",
        reminder.client_name,
        reminder.service_name,
        reminder.specialist_name,
        reminder.business_name,
        reminder.starts_at.format("%d/%m/%Y"),
        reminder.starts_at.format("%H:%M"),
    )
}
