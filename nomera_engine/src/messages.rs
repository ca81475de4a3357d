//! Customer- and admin-facing message texts and inline keyboards.
//!
//! All texts are built from the order snapshot, so a lost message can always be resent from current
//! state. The engine sends these through the [`crate::traits::MessagingGateway`]; nothing here performs
//! I/O.

use npe_common::Uah;

use crate::{
    callback::{BotCallback, CallbackAction},
    config::TON_DISCOUNT_PERCENT,
    order_types::{DeliveryData, Order, TonAddress},
    traits::MessageButton,
};

fn lines_block(order: &Order) -> String {
    order.lines.iter().map(|l| format!("{} - {}", l.phone_number, l.price)).collect::<Vec<_>>().join("\n")
}

fn delivery_block(data: &DeliveryData) -> String {
    format!(
        "Телефон: {}\nПрізвище: {}\nІм'я: {}\nМісто: {}\nОбласть: {}\nРайон: {}\nСклад НП №: {}",
        data.phone,
        data.last_name,
        data.first_name,
        data.city,
        data.region,
        data.district_or_placeholder(),
        data.pickup_point
    )
}

/// The UAH equivalent of the discounted TON total, shown alongside the TON quote.
fn discounted_uah(order: &Order) -> Uah {
    Uah::from_kopiyky(order.total.to_kopiyky() * (100 - TON_DISCOUNT_PERCENT) / 100)
}

fn button(label: impl Into<String>, action: CallbackAction, order: &Order) -> MessageButton {
    MessageButton::new(label, BotCallback::new(action, order.order_id.clone()))
}

/// The two-button decision card the admin gets for every new order.
pub fn admin_new_order(order: &Order) -> (String, Vec<MessageButton>) {
    let text = format!(
        "🛒 Нове замовлення {}\n\n📱 Номер:\n{}\n\n💰 Загальна сума: {}\n💎 У TON: {}\n\n👤 Замовник: {} (ID: {})",
        order.order_id,
        lines_block(order),
        order.total,
        order.discounted_ton,
        order.customer.display_name(),
        order.customer.chat
    );
    let buttons = vec![
        button("✅ В наявності", CallbackAction::Available, order),
        button("❌ Номера немає", CallbackAction::Unavailable, order),
    ];
    (text, buttons)
}

pub fn customer_order_received(order: &Order) -> String {
    format!(
        "🛒 Ваше замовлення {}\n\n📱 Номер:\n{}\n\n💰 Загальна сума: {}\nабо\n💎 з додатковою знижкою (-{}%) у TON: \
         {} (приблизно {})\n\nЗачекайте, будь ласка, відповіді менеджера,\nперевіряємо наявність номерів на ваше \
         замовлення...",
        order.order_id,
        lines_block(order),
        order.total,
        TON_DISCOUNT_PERCENT,
        order.discounted_ton,
        discounted_uah(order)
    )
}

pub fn admin_available_ack() -> &'static str {
    "✅ Відправлено запит клієнту на заповнення даних"
}

pub fn admin_unavailable_ack() -> &'static str {
    "❌ Відправлено повідомлення клієнту про відсутність номера"
}

pub fn customer_unavailable() -> &'static str {
    "❌ Номер зараз недоступний, з вами зв'яжеться менеджер для уточнення інформації"
}

/// Availability confirmation plus the structured delivery form reference.
pub fn customer_delivery_form_request(order: &Order) -> (String, Vec<MessageButton>) {
    let text = format!(
        "✅ Номер {} в наявності!\n\nПовідомте, будь ласка, дані для відправки Новою поштою.\nНатисніть кнопку нижче \
         для введення даних:",
        order.phone_list()
    );
    let buttons = vec![button("📝 Заповнити дані", CallbackAction::FillForm, order)];
    (text, buttons)
}

fn payment_keyboard(order: &Order) -> Vec<MessageButton> {
    vec![
        button("💵 Оплата при отриманні", CallbackAction::PayCash, order),
        button(
            format!("💎 Оплатити в TON -{}% ({})", TON_DISCOUNT_PERCENT, order.discounted_ton),
            CallbackAction::PayTon,
            order,
        ),
    ]
}

pub fn customer_payment_choice(order: &Order) -> (String, Vec<MessageButton>) {
    let text = format!(
        "✅ Дані збережено!\n\n📱 Номер: {}\n💰 Сума: {}\n\nВиберіть спосіб оплати:",
        order.phone_list(),
        order.total
    );
    (text, payment_keyboard(order))
}

/// The full summary the admin gets once the customer commits to cash on delivery. Delivery fields are
/// reproduced verbatim.
pub fn admin_cash_summary(order: &Order) -> String {
    let delivery = order.delivery.as_ref().map(delivery_block).unwrap_or_else(|| "(дані відсутні)".to_string());
    format!(
        "📦 Замовлення {} підтверджено (Оплата при отриманні)\n\n📱 Номер: {}\n💰 Сума: {}\n\n👤 Замовник: {} (ID: \
         {})\n\n📮 Дані для відправки:\n{}",
        order.order_id,
        order.phone_list(),
        order.total,
        order.customer.display_name(),
        order.customer.chat,
        delivery
    )
}

pub fn customer_cash_ack() -> &'static str {
    "✅ Ваше замовлення прийняте.\n\nЗ вами можуть додатково зв'язатися для уточнення даних, що відсутні (невірні)"
}

/// TON transfer instructions with the frozen discounted amount and the cancel escape hatch.
pub fn customer_ton_instructions(order: &Order, wallet: &TonAddress) -> (String, Vec<MessageButton>) {
    let text = format!(
        "💎 Оплата в TON\n\nПерекажіть точну суму {} на гаманець:\n{}\n\nПризначення платежу: {}\n\nПісля переказу \
         оплату буде підтверджено автоматично. Якщо оплата не надійде протягом 10 хвилин, ми запропонуємо оплату при \
         отриманні.",
        order.discounted_ton,
        wallet,
        order.order_id
    );
    let buttons = vec![button("↩️ Скасувати оплату в TON", CallbackAction::CancelTon, order)];
    (text, buttons)
}

pub fn admin_ton_pending(order: &Order) -> String {
    format!(
        "💎 Замовлення {} очікує оплату в TON: {} від {}",
        order.order_id,
        order.discounted_ton,
        order.customer.display_name()
    )
}

pub fn customer_ton_paid(order: &Order) -> String {
    format!(
        "✅ Оплату {} отримано! Ваше замовлення {} прийняте.\n\nЗ вами можуть додатково зв'язатися для уточнення даних.",
        order.discounted_ton, order.order_id
    )
}

/// The admin receipt for a confirmed TON payment, including the transaction reference and delivery data.
pub fn admin_ton_receipt(order: &Order, tx_ref: &str) -> String {
    let delivery = order.delivery.as_ref().map(delivery_block).unwrap_or_else(|| "(дані відсутні)".to_string());
    format!(
        "💎 Замовлення {} оплачено в TON\n\n📱 Номер: {}\n💰 Сума: {} ({})\n🧾 Транзакція: {}\n\n👤 Замовник: {} (ID: \
         {})\n\n📮 Дані для відправки:\n{}",
        order.order_id,
        order.phone_list(),
        order.discounted_ton,
        order.total,
        tx_ref,
        order.customer.display_name(),
        order.customer.chat,
        delivery
    )
}

/// Offered when the TON window lapses or the customer backs out: same payment keyboard, cash first.
pub fn customer_ton_fallback(order: &Order, timed_out: bool) -> (String, Vec<MessageButton>) {
    let reason = if timed_out {
        "⏳ Час на оплату в TON вичерпано."
    } else {
        "↩️ Оплату в TON скасовано."
    };
    let text = format!(
        "{reason}\n\n📱 Номер: {}\n💰 Сума: {}\n\nВиберіть спосіб оплати:",
        order.phone_list(),
        order.total
    );
    (text, payment_keyboard(order))
}

pub fn admin_ton_cancelled(order: &Order, timed_out: bool) -> String {
    let reason = if timed_out { "час вичерпано" } else { "скасовано клієнтом" };
    format!("↩️ Оплату в TON для замовлення {} не здійснено ({reason})", order.order_id)
}
