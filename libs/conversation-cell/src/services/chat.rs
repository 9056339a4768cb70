use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use appointment_cell::models::AppointmentError;
use appointment_cell::services::{AppointmentBookingService, AvailabilityService};
use shared_utils::AppState;

use crate::error::ConversationError;
use crate::models::{BookingIntent, ChatReply, ConversationState};
use crate::services::store::ConversationStore;

/// Turns accumulated chat intents into calls on the booking service. Owns no
/// scheduling rules of its own.
pub struct ChatBookingAdapter {
    store: Arc<dyn ConversationStore>,
    booking: AppointmentBookingService,
    availability: AvailabilityService,
}

impl ChatBookingAdapter {
    pub fn new(state: &AppState, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            store,
            booking: AppointmentBookingService::new(state),
            availability: AvailabilityService::new(state),
        }
    }

    pub async fn handle_intent(
        &self,
        conversation_id: &str,
        intent: BookingIntent,
    ) -> Result<ChatReply, ConversationError> {
        let mut state = self
            .store
            .get(conversation_id)
            .await?
            .unwrap_or_else(|| ConversationState::new(conversation_id));
        state.intent.merge(intent);
        state.updated_at = Utc::now();

        let missing = state.intent.missing_fields();
        if !missing.is_empty() {
            debug!("Conversation {} still needs {:?}", conversation_id, missing);
            self.store.put(&state).await?;
            return Ok(ChatReply::NeedsDetails {
                missing,
                intent: state.intent,
            });
        }

        match self.booking.book_appointment(state.intent.to_booking_request()).await {
            Ok(appointment) => {
                info!("Conversation {} booked appointment {}", conversation_id, appointment.id);
                self.store.delete(conversation_id).await?;
                Ok(ChatReply::Booked { appointment })
            }
            Err(AppointmentError::ConflictDetected(message)) => {
                state.intent.appointment_time = None;
                self.store.put(&state).await?;

                let alternatives = match state.intent.appointment_date {
                    Some(date) => {
                        self.availability
                            .get_availability(date, state.intent.duration_minutes)
                            .await?
                            .slots
                    }
                    None => Vec::new(),
                };

                Ok(ChatReply::SlotTaken {
                    message,
                    alternatives,
                    intent: state.intent,
                })
            }
            Err(e) => {
                self.store.put(&state).await?;
                Err(e.into())
            }
        }
    }

    pub async fn reset(&self, conversation_id: &str) -> Result<(), ConversationError> {
        debug!("Resetting conversation {}", conversation_id);
        self.store.delete(conversation_id).await
    }
}
