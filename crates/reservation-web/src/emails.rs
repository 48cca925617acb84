//! Email bodies for reservation events.

use askama::Template;
use database::Reservation;
use mailer::Email;
use notifier::EventDetails;

/// HTML part of the cancellation notice.
#[derive(Template)]
#[template(path = "emails/cancellation.html")]
struct CancellationTemplate<'a> {
    title: &'a str,
    schedule: &'a str,
    name: &'a str,
    id: &'a str,
}

/// HTML part of the reservation confirmation.
#[derive(Template)]
#[template(path = "emails/confirmation.html")]
struct ConfirmationTemplate<'a> {
    title: &'a str,
    schedule: &'a str,
    venue: &'a str,
    fee: &'a str,
    name: &'a str,
    affiliation: &'a str,
    favorite: &'a str,
    email: &'a str,
    id: &'a str,
    cancel_url: &'a str,
}

/// Cancellation notice sent after a successful cancel.
pub fn cancellation_email(event: &EventDetails, reservation: &Reservation) -> askama::Result<Email> {
    let subject = format!("【{}】予約キャンセル完了", event.title);

    let text = format!(
        "{subject}\n\n\
         {name} 様\n\n\
         以下の予約をキャンセルいたしました。\n\n\
         ━━━━━━━━━━━━━━━━━━━━\n\
         📅 キャンセルされた予約\n\
         ━━━━━━━━━━━━━━━━━━━━\n\
         イベント: {title}\n\
         日時: {schedule}\n\
         お名前: {name}\n\
         予約ID: {id}\n\n\
         またの機会がございましたら、ぜひご参加ください。\n\n\
         ご質問等ございましたら、このメールに返信してください。\n\n\
         ────────────────────────\n\
         {title} 運営事務局\n\
         ────────────────────────\n",
        subject = subject,
        name = reservation.name,
        title = event.title,
        schedule = event.schedule,
        id = reservation.id,
    );

    let html = CancellationTemplate {
        title: &event.title,
        schedule: &event.schedule,
        name: &reservation.name,
        id: &reservation.id,
    }
    .render()?;

    Ok(Email::new(reservation.email.clone(), subject, text).with_html(html))
}

/// Confirmation sent after a reservation is created, when enabled.
pub fn confirmation_email(event: &EventDetails, reservation: &Reservation) -> askama::Result<Email> {
    let subject = format!("【{}】予約確認 - {}", event.title, event.schedule);
    let cancel_url = event.cancel_url(Some((reservation.id.as_str(), reservation.email.as_str())));

    let text = format!(
        "【{title}】予約確認\n\n\
         {name} 様\n\n\
         この度は「{title}」へのお申し込みありがとうございます。\n\
         以下の内容で予約を承りました。\n\n\
         ━━━━━━━━━━━━━━━━━━━━\n\
         📅 イベント詳細\n\
         ━━━━━━━━━━━━━━━━━━━━\n\
         イベント名: {title}\n\
         日時: {schedule}\n\
         会場: {venue}\n\
         会費: {fee}\n\n\
         ━━━━━━━━━━━━━━━━━━━━\n\
         👤 ご予約情報\n\
         ━━━━━━━━━━━━━━━━━━━━\n\
         お名前: {name}\n\
         所属: {affiliation}\n\
         今の推し: {favorite}\n\
         メールアドレス: {email}\n\
         予約ID: {id}\n\n\
         キャンセルURL: {cancel_url}\n\n\
         当日お会いできることを楽しみにしております！\n",
        title = event.title,
        schedule = event.schedule,
        venue = event.venue,
        fee = event.fee,
        name = reservation.name,
        affiliation = reservation.affiliation,
        favorite = reservation.favorite,
        email = reservation.email,
        id = reservation.id,
        cancel_url = cancel_url,
    );

    let html = ConfirmationTemplate {
        title: &event.title,
        schedule: &event.schedule,
        venue: &event.venue,
        fee: &event.fee,
        name: &reservation.name,
        affiliation: &reservation.affiliation,
        favorite: &reservation.favorite,
        email: &reservation.email,
        id: &reservation.id,
        cancel_url: &cancel_url,
    }
    .render()?;

    Ok(Email::new(reservation.email.clone(), subject, text).with_html(html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::ReservationStatus;

    fn reservation() -> Reservation {
        Reservation {
            id: "7f1c2d9e-0000-4000-8000-000000000001".to_string(),
            name: "<田中>".to_string(),
            affiliation: "大学".to_string(),
            favorite: "音楽".to_string(),
            email: "a@b.com".to_string(),
            status: ReservationStatus::Cancelled,
            reservation_date: "2024-11-01T00:00:00.000000Z".to_string(),
            created_at: "2024-11-01T00:00:00.000000Z".to_string(),
            cancelled_at: Some("2024-11-02T00:00:00.000000Z".to_string()),
            line_user_id: None,
        }
    }

    #[test]
    fn test_cancellation_email() {
        let email = cancellation_email(&EventDetails::default(), &reservation()).unwrap();
        assert_eq!(email.to, "a@b.com");
        assert_eq!(email.subject, "【みなとランチ】予約キャンセル完了");
        assert!(email.body.contains("予約ID: 7f1c2d9e-0000-4000-8000-000000000001"));
        assert!(email.body.contains("<田中> 様"));

        let html = email.html_body.unwrap();
        assert!(html.contains("&lt;田中&gt; 様"));
        assert!(!html.contains("<田中>"));
    }

    #[test]
    fn test_confirmation_email_has_cancel_link() {
        let email = confirmation_email(&EventDetails::default(), &reservation()).unwrap();
        assert!(email.subject.starts_with("【みなとランチ】予約確認"));
        assert!(email
            .body
            .contains("http://localhost:3000/cancel.html?id=7f1c2d9e-0000-4000-8000-000000000001&email=a%40b.com"));

        let html = email.html_body.unwrap();
        assert!(html.contains("&lt;田中&gt; 様"));
        assert!(html.contains("id=7f1c2d9e-0000-4000-8000-000000000001&amp;email=a%40b.com"));
    }
}
