use actix::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::models::app_state::{AppState, Delivery};
use crate::models::messages::{RelayMessage, RelayText};

/// One relay client connection.
pub struct RelaySocket {
    pub id: String,
    pub app_state: web::Data<AppState>,
}

impl Actor for RelaySocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let addr = ctx.address();
        let mut sessions = self.app_state.sessions.lock().unwrap();
        sessions.insert(self.id.clone(), addr);
        info!("WebSocket connection started: {}", self.id);
        info!("Total active sessions: {}", sessions.len());
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        self.app_state.router.lock().unwrap().disconnect(&self.id);

        let mut sessions = self.app_state.sessions.lock().unwrap();
        sessions.remove(&self.id);
        info!("WebSocket connection closed: {}", self.id);
        info!("Total active sessions: {}", sessions.len());

        Running::Stop
    }
}

impl Handler<RelayText> for RelaySocket {
    type Result = ();

    fn handle(&mut self, msg: RelayText, ctx: &mut Self::Context) {
        debug!("Forwarding message to client {}: {}", self.id, msg.0);
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for RelaySocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Text(text)) => {
                debug!("Received text message from {}: {}", self.id, text);
                match RelayMessage::from_json(&text) {
                    Ok(relay_msg) => self.relay(relay_msg),
                    Err(e) => warn!("Dropping malformed message from {}: {}", self.id, e),
                }
            }
            Ok(ws::Message::Binary(_)) => {
                warn!("Binary messages are not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                info!("Connection closed: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            _ => {
                ctx.stop();
            }
        }
    }
}

impl RelaySocket {
    fn relay(&self, msg: RelayMessage) {
        let deliveries = self.app_state.router.lock().unwrap().route(&self.id, msg);
        self.deliver(deliveries);
    }

    /// Writes each delivery to its connection, this one included.
    pub fn deliver(&self, deliveries: Vec<Delivery>) {
        if deliveries.is_empty() {
            return;
        }
        let sessions = self.app_state.sessions.lock().unwrap();
        for delivery in deliveries {
            let text = match delivery.message.to_json() {
                Ok(s) => s,
                Err(e) => {
                    warn!("Error serializing message: {}", e);
                    continue;
                }
            };
            match sessions.get(&delivery.conn_id) {
                Some(addr) => addr.do_send(RelayText(text)),
                None => warn!("Session not found for connection ID: {}", delivery.conn_id),
            }
        }
    }
}

/// WebSocket connection handler
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = Uuid::new_v4().to_string();
    info!("New WebSocket connection request, assigned {}", id);

    let ws = RelaySocket {
        id,
        app_state: app_state.clone(),
    };
    ws::start(ws, &req, stream)
}
