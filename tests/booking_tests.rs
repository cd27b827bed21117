//! # Booking Flow Tests
//!
//! Drives the booking state machine against an in-process backend and checks
//! stage ordering, draft lifetime and the calls made to the gateway.

mod common;

use chrono::NaiveDate;
use clinic_bot::booking::{BookingEvent, BookingReply, BookingStage, MAX_DOCTOR_CHOICES};
use clinic_bot::errors::{ClinicError, GatewayError};
use clinic_bot::models::EntityId;
use clinic_bot::store::UserKey;
use common::{doctor, sample_doctors, FakeGateway, Harness, EMAIL, TOKEN};
use std::time::Duration;

#[cfg(test)]
mod tests {
    use super::*;

    const USER: UserKey = UserKey(42);

    async fn logged_in_harness() -> Harness {
        let harness = Harness::new(FakeGateway::with_doctors(sample_doctors()));
        harness.login(USER).await;
        harness
    }

    fn tomorrow() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
    }

    #[tokio::test]
    async fn test_select_doctor_before_start_is_rejected() {
        let harness = logged_in_harness().await;

        let result = harness
            .state
            .booking
            .handle(USER, BookingEvent::SelectDoctor(1.into()))
            .await;

        assert_eq!(result, Err(ClinicError::NoActiveBooking));
        assert!(harness.state.booking.draft(USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_out_of_order_events_are_rejected() {
        let harness = logged_in_harness().await;
        let booking = &harness.state.booking;

        assert_eq!(
            booking.handle(USER, BookingEvent::SelectTime("09:00".into())).await,
            Err(ClinicError::NoActiveBooking)
        );
        assert_eq!(booking.handle(USER, BookingEvent::Confirm).await, Err(ClinicError::NoActiveBooking));

        booking.handle(USER, BookingEvent::Start).await.unwrap();
        assert_eq!(
            booking.handle(USER, BookingEvent::SelectTime("09:00".into())).await,
            Err(ClinicError::UnexpectedStep)
        );
        assert_eq!(booking.handle(USER, BookingEvent::Confirm).await, Err(ClinicError::UnexpectedStep));

        // The rejected confirm must not have consumed the draft
        let draft = booking.draft(USER).await.unwrap().unwrap();
        assert_eq!(draft.stage, BookingStage::SelectingDoctor);
        assert!(harness.gateway.create_calls().is_empty());
    }

    #[tokio::test]
    async fn test_start_requires_login() {
        let harness = Harness::new(FakeGateway::with_doctors(sample_doctors()));

        let result = harness.state.booking.handle(USER, BookingEvent::Start).await;

        assert_eq!(result, Err(ClinicError::Unauthenticated));
        assert!(harness.state.booking.draft(USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_start_with_no_doctors_retains_no_draft() {
        let harness = Harness::new(FakeGateway::default());
        harness.login(USER).await;

        let result = harness.state.booking.handle(USER, BookingEvent::Start).await;

        assert_eq!(result, Err(ClinicError::NoDoctorsAvailable));
        assert!(harness.state.booking.draft(USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_start_offers_at_most_eight_doctors() {
        let doctors = (1..=12).map(|id| doctor(id, "Имя", "Фамилия", "Терапия")).collect();
        let harness = Harness::new(FakeGateway::with_doctors(doctors));
        harness.login(USER).await;

        let reply = harness.state.booking.handle(USER, BookingEvent::Start).await.unwrap();

        match reply {
            BookingReply::ChooseDoctor { doctors } => {
                assert_eq!(doctors.len(), MAX_DOCTOR_CHOICES);
                assert_eq!(doctors[0].id, EntityId::Int(1));
            }
            other => panic!("unexpected reply: {other:?}"),
        }

        // A doctor outside the offered set cannot be picked
        let result = harness
            .state
            .booking
            .handle(USER, BookingEvent::SelectDoctor(12.into()))
            .await;
        assert!(matches!(result, Err(ClinicError::InvalidSelection(_))));
    }

    #[tokio::test]
    async fn test_full_flow_creates_exactly_one_appointment_for_tomorrow() {
        let harness = logged_in_harness().await;
        let booking = &harness.state.booking;

        booking.handle(USER, BookingEvent::Start).await.unwrap();

        let reply = booking.handle(USER, BookingEvent::SelectDoctor(2.into())).await.unwrap();
        match &reply {
            BookingReply::ChooseTime { doctor, slots } => {
                assert_eq!(doctor.display_name, "Игорь Петров");
                assert_eq!(doctor.specialization, "Терапия");
                assert_eq!(slots.len(), 7);
            }
            other => panic!("unexpected reply: {other:?}"),
        }

        let reply = booking
            .handle(USER, BookingEvent::SelectTime("14:00".into()))
            .await
            .unwrap();
        match &reply {
            BookingReply::Confirm { date, time, .. } => {
                assert_eq!(*date, tomorrow());
                assert_eq!(time.as_str(), "14:00");
            }
            other => panic!("unexpected reply: {other:?}"),
        }

        let reply = booking.handle(USER, BookingEvent::Confirm).await.unwrap();
        match reply {
            BookingReply::Booked {
                appointment_id,
                doctor,
                date,
                time,
            } => {
                assert_eq!(appointment_id, EntityId::Int(101));
                assert_eq!(doctor.id, EntityId::Int(2));
                assert_eq!(date, tomorrow());
                assert_eq!(time.as_str(), "14:00");
            }
            other => panic!("unexpected reply: {other:?}"),
        }

        let calls = harness.gateway.create_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].doctor_id, EntityId::Int(2));
        assert_eq!(calls[0].date, tomorrow());
        assert_eq!(calls[0].time, "14:00");
        assert_eq!(calls[0].email, EMAIL);
        assert_eq!(calls[0].token, TOKEN);

        assert!(booking.draft(USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_repeated_confirm_does_not_book_twice() {
        let harness = logged_in_harness().await;
        let booking = &harness.state.booking;

        booking.handle(USER, BookingEvent::Start).await.unwrap();
        booking.handle(USER, BookingEvent::SelectDoctor(1.into())).await.unwrap();
        booking.handle(USER, BookingEvent::SelectTime("09:00".into())).await.unwrap();

        assert!(booking.handle(USER, BookingEvent::Confirm).await.is_ok());
        assert_eq!(booking.handle(USER, BookingEvent::Confirm).await, Err(ClinicError::NoActiveBooking));
        assert_eq!(harness.gateway.create_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_at_every_stage_discards_draft() {
        let harness = logged_in_harness().await;
        let booking = &harness.state.booking;

        let steps: [&[BookingEvent]; 3] = [
            &[BookingEvent::Start],
            &[BookingEvent::Start, BookingEvent::SelectDoctor(1.into())],
            &[
                BookingEvent::Start,
                BookingEvent::SelectDoctor(1.into()),
                BookingEvent::SelectTime("10:00".into()),
            ],
        ];

        for events in steps {
            for event in events {
                booking.handle(USER, event.clone()).await.unwrap();
            }
            assert!(booking.draft(USER).await.unwrap().is_some());

            assert_eq!(booking.handle(USER, BookingEvent::Cancel).await, Ok(BookingReply::Cancelled));
            assert!(booking.draft(USER).await.unwrap().is_none());
        }

        assert!(harness.gateway.create_calls().is_empty());
    }

    #[tokio::test]
    async fn test_restart_after_cancel_has_no_residual_fields() {
        let harness = logged_in_harness().await;
        let booking = &harness.state.booking;

        booking.handle(USER, BookingEvent::Start).await.unwrap();
        booking.handle(USER, BookingEvent::SelectDoctor(3.into())).await.unwrap();
        booking.handle(USER, BookingEvent::SelectTime("17:00".into())).await.unwrap();
        booking.handle(USER, BookingEvent::Cancel).await.unwrap();

        booking.handle(USER, BookingEvent::Start).await.unwrap();

        let draft = booking.draft(USER).await.unwrap().unwrap();
        assert_eq!(draft.stage, BookingStage::SelectingDoctor);
        assert_eq!(booking.handle(USER, BookingEvent::Confirm).await, Err(ClinicError::UnexpectedStep));
    }

    #[tokio::test]
    async fn test_cancel_without_draft_is_harmless() {
        let harness = logged_in_harness().await;

        let reply = harness.state.booking.handle(USER, BookingEvent::Cancel).await;

        assert_eq!(reply, Ok(BookingReply::Cancelled));
    }

    #[tokio::test]
    async fn test_doctor_lookup_failure_keeps_stage() {
        let harness = logged_in_harness().await;
        harness.gateway.fail_doctor_lookup(2);
        let booking = &harness.state.booking;

        booking.handle(USER, BookingEvent::Start).await.unwrap();
        let result = booking.handle(USER, BookingEvent::SelectDoctor(2.into())).await;

        assert_eq!(result, Err(ClinicError::DoctorLookupFailed));
        let draft = booking.draft(USER).await.unwrap().unwrap();
        assert_eq!(draft.stage, BookingStage::SelectingDoctor);

        // Another doctor can still be picked
        assert!(booking.handle(USER, BookingEvent::SelectDoctor(1.into())).await.is_ok());
    }

    #[tokio::test]
    async fn test_going_back_overwrites_earlier_choices() {
        let harness = logged_in_harness().await;
        let booking = &harness.state.booking;

        booking.handle(USER, BookingEvent::Start).await.unwrap();
        booking.handle(USER, BookingEvent::SelectDoctor(1.into())).await.unwrap();
        booking.handle(USER, BookingEvent::SelectTime("09:00".into())).await.unwrap();

        // New time while confirming
        booking.handle(USER, BookingEvent::SelectTime("11:00".into())).await.unwrap();
        // New doctor while confirming drops the chosen time
        booking.handle(USER, BookingEvent::SelectDoctor(3.into())).await.unwrap();
        let draft = booking.draft(USER).await.unwrap().unwrap();
        assert_eq!(draft.stage.name(), "selecting_time");

        booking.handle(USER, BookingEvent::SelectTime("16:00".into())).await.unwrap();
        booking.handle(USER, BookingEvent::Confirm).await.unwrap();

        let calls = harness.gateway.create_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].doctor_id, EntityId::Int(3));
        assert_eq!(calls[0].time, "16:00");
    }

    #[tokio::test]
    async fn test_unknown_time_slot_is_rejected() {
        let harness = logged_in_harness().await;
        let booking = &harness.state.booking;

        booking.handle(USER, BookingEvent::Start).await.unwrap();
        booking.handle(USER, BookingEvent::SelectDoctor(1.into())).await.unwrap();

        let result = booking.handle(USER, BookingEvent::SelectTime("13:00".into())).await;
        assert_eq!(result, Err(ClinicError::InvalidSelection("13:00".into())));
    }

    #[tokio::test]
    async fn test_creation_failure_discards_draft() {
        let harness = logged_in_harness().await;
        harness.gateway.fail_create(GatewayError::Status(500));
        let booking = &harness.state.booking;

        booking.handle(USER, BookingEvent::Start).await.unwrap();
        booking.handle(USER, BookingEvent::SelectDoctor(1.into())).await.unwrap();
        booking.handle(USER, BookingEvent::SelectTime("09:00".into())).await.unwrap();

        assert_eq!(
            booking.handle(USER, BookingEvent::Confirm).await,
            Err(ClinicError::AppointmentCreationFailed)
        );
        assert!(booking.draft(USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_room_is_reported() {
        let harness = logged_in_harness().await;
        harness.gateway.fail_create(GatewayError::NoRoomsAvailable);
        let booking = &harness.state.booking;

        booking.handle(USER, BookingEvent::Start).await.unwrap();
        booking.handle(USER, BookingEvent::SelectDoctor(1.into())).await.unwrap();
        booking.handle(USER, BookingEvent::SelectTime("09:00".into())).await.unwrap();

        assert_eq!(booking.handle(USER, BookingEvent::Confirm).await, Err(ClinicError::NoRoomsAvailable));
    }

    #[tokio::test]
    async fn test_logout_mid_flow_drops_draft() {
        let harness = logged_in_harness().await;

        harness.state.booking.handle(USER, BookingEvent::Start).await.unwrap();
        assert!(harness.state.service.logout(USER).await.unwrap());

        assert!(harness.state.booking.draft(USER).await.unwrap().is_none());
        assert_eq!(
            harness.state.booking.handle(USER, BookingEvent::Start).await,
            Err(ClinicError::Unauthenticated)
        );
    }

    #[tokio::test]
    async fn test_users_do_not_share_drafts() {
        let harness = logged_in_harness().await;
        let other = UserKey(7);
        harness.login(other).await;
        let booking = &harness.state.booking;

        booking.handle(USER, BookingEvent::Start).await.unwrap();
        booking.handle(USER, BookingEvent::SelectDoctor(1.into())).await.unwrap();

        assert_eq!(
            booking.handle(other, BookingEvent::SelectTime("09:00".into())).await,
            Err(ClinicError::NoActiveBooking)
        );
        booking.handle(other, BookingEvent::Start).await.unwrap();
        assert_eq!(
            booking.draft(USER).await.unwrap().unwrap().stage.name(),
            "selecting_time"
        );
    }

    #[tokio::test]
    async fn test_idle_draft_expires() {
        let harness = Harness::with_draft_ttl(
            FakeGateway::with_doctors(sample_doctors()),
            Duration::from_secs(15 * 60),
        );
        harness.login(USER).await;
        let booking = &harness.state.booking;

        booking.handle(USER, BookingEvent::Start).await.unwrap();
        harness.clock.advance(chrono::Duration::minutes(14));
        booking.handle(USER, BookingEvent::SelectDoctor(1.into())).await.unwrap();

        harness.clock.advance(chrono::Duration::minutes(15));
        assert_eq!(
            booking.handle(USER, BookingEvent::SelectTime("09:00".into())).await,
            Err(ClinicError::NoActiveBooking)
        );
    }
}
