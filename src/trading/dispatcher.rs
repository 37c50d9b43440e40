use tracing::{error, info, warn};

use crate::exchange::{Exchange, OrderAck, OrderRequest};
use crate::models::TradingMode;
use crate::notify::{format_signal_message, Notifier};
use crate::strategies::Signal;

/// What happened to one signal on its way out.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub order: OrderRequest,
    pub ack: Option<OrderAck>,
    pub notified: bool,
}

/// Turns confirmed signals into an order and a chat message.
pub struct SignalDispatcher {
    symbol: String,
    quantity: f64,
    mode: TradingMode,
    notifier: Option<Box<dyn Notifier>>,
}

impl SignalDispatcher {
    pub fn new(
        symbol: &str,
        quantity: f64,
        mode: TradingMode,
        notifier: Option<Box<dyn Notifier>>,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            quantity,
            mode,
            notifier,
        }
    }

    pub fn has_notifier(&self) -> bool {
        self.notifier.is_some()
    }

    /// Submit first, then notify. Neither failure stops the other.
    pub async fn dispatch(&self, exchange: &mut dyn Exchange, signal: &Signal) -> DispatchReport {
        let order = OrderRequest::from_signal(signal, &self.symbol, self.quantity);

        info!(
            "Placing {}MARKET {} {} qty={} entry≈{:.6} SL={:.6} TP={:.6}",
            if self.mode == TradingMode::Demo { "TEST " } else { "" },
            order.side,
            order.symbol,
            order.quantity,
            order.entry_price,
            order.stop_loss,
            order.take_profit
        );

        let ack = match exchange.submit_order(&order).await {
            Ok(ack) => {
                info!(
                    "Order submitted: status={} id={:?} test={}",
                    ack.status, ack.order_id, ack.test
                );
                Some(ack)
            }
            Err(e) => {
                error!("Order submission failed: {:#}", e);
                None
            }
        };

        let notified = match &self.notifier {
            Some(notifier) => {
                let text = format_signal_message(signal, &self.symbol, self.mode);
                match notifier.send(&text).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Notification failed: {:#}", e);
                        false
                    }
                }
            }
            None => false,
        };

        DispatchReport {
            order,
            ack,
            notified,
        }
    }
}
