//! Event loop owning one form instance.
//!
//! A single task applies events strictly one at a time: user input arrives
//! through a [`FormHandle`], network completions are posted back onto the
//! same queue by the tasks that perform the calls. Nothing else touches the
//! form, so no lock is needed; superseded completions are filtered by the
//! form itself.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};

use crate::error::{FieldError, FormClosed};
use crate::form::machine::{Ack, Command, Form, FormEvent, FormView, SubmitAck};
use crate::form::prediction::{PredictionService, RequestStatus};
use crate::form::profile::FormProfile;
use crate::form::weather::{QueryStatus, WeatherSource};

/// Remote collaborators of a form, plus the bound on each call
#[derive(Clone)]
pub struct Services {
    pub weather: Arc<dyn WeatherSource>,
    pub prediction: Arc<dyn PredictionService>,
    pub timeout: Duration,
}

enum Message {
    Event {
        event: FormEvent,
        reply: Option<oneshot::Sender<Ack>>,
    },
    Submit(oneshot::Sender<SubmitAck>),
}

/// Cloneable handle to a running form. The form shuts down once every
/// handle is dropped; completions still in flight are then discarded.
#[derive(Clone)]
pub struct FormHandle {
    events: mpsc::UnboundedSender<Message>,
    view: watch::Receiver<FormView>,
}

/// Start a form on the current tokio runtime.
pub fn spawn_form(profile: FormProfile, services: Services) -> FormHandle {
    let form = Form::new(profile);
    let (events, inbox) = mpsc::unbounded_channel();
    let (view_tx, view) = watch::channel(form.view());

    let event_loop = EventLoop {
        form,
        completions: events.downgrade(),
        view: view_tx,
        services,
    };
    tokio::spawn(event_loop.run(inbox));

    FormHandle { events, view }
}

struct EventLoop {
    form: Form,
    completions: mpsc::WeakUnboundedSender<Message>,
    view: watch::Sender<FormView>,
    services: Services,
}

impl EventLoop {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Message>) {
        tracing::debug!("Form opened ({:?})", self.form.profile());
        while let Some(message) = inbox.recv().await {
            match message {
                Message::Event { event, reply } => {
                    let step = self.form.handle(event);
                    self.settle(step.command);
                    if let Some(reply) = reply {
                        let _ = reply.send(step.ack);
                    }
                }
                Message::Submit(reply) => {
                    let (ack, send) = self.form.submit();
                    self.settle(send.map(Command::SendPrediction));
                    let _ = reply.send(ack);
                }
            }
        }
        tracing::debug!(
            "Form closed after dropping {} stale weather responses",
            self.form.stale_responses()
        );
    }

    /// Start the requested call, if any, and publish the new state.
    fn settle(&self, command: Option<Command>) {
        if let Some(command) = command {
            self.dispatch(command);
        }
        self.view.send_replace(self.form.view());
    }

    fn dispatch(&self, command: Command) {
        let completions = self.completions.clone();
        let timeout = self.services.timeout;
        match command {
            Command::FetchWeather(fetch) => {
                let source = Arc::clone(&self.services.weather);
                tokio::spawn(async move {
                    let outcome = fetch.run(source.as_ref(), timeout).await;
                    deliver(
                        &completions,
                        FormEvent::WeatherCompleted {
                            attempt: fetch.attempt,
                            generation: fetch.generation,
                            outcome,
                        },
                    );
                });
            }
            Command::SendPrediction(send) => {
                let service = Arc::clone(&self.services.prediction);
                tokio::spawn(async move {
                    let outcome = send.run(service.as_ref(), timeout).await;
                    deliver(
                        &completions,
                        FormEvent::PredictionCompleted {
                            request_id: send.request_id,
                            outcome,
                        },
                    );
                });
            }
        }
    }
}

fn deliver(completions: &mpsc::WeakUnboundedSender<Message>, event: FormEvent) {
    match completions.upgrade() {
        Some(tx) => {
            let _ = tx.send(Message::Event { event, reply: None });
        }
        None => tracing::debug!("Form gone, discarding completion"),
    }
}

fn is_settled(view: &FormView) -> bool {
    view.weather.status() != QueryStatus::Loading
        && view
            .prediction
            .as_ref()
            .map_or(true, |p| p.status() != RequestStatus::Submitting)
}

impl FormHandle {
    /// Apply one event and return its immediate answer
    pub async fn send(&self, event: FormEvent) -> Result<Ack, FormClosed> {
        let (reply, answer) = oneshot::channel();
        self.events
            .send(Message::Event {
                event,
                reply: Some(reply),
            })
            .map_err(|_| FormClosed)?;
        answer.await.map_err(|_| FormClosed)
    }

    pub async fn edit_location(&self, text: impl Into<String>) -> Result<(), FormClosed> {
        self.send(FormEvent::LocationEdited(text.into())).await.map(drop)
    }

    pub async fn commit_location(&self) -> Result<(), FormClosed> {
        self.send(FormEvent::LocationCommitted).await.map(drop)
    }

    pub async fn retry_weather(&self) -> Result<(), FormClosed> {
        self.send(FormEvent::RetryWeather).await.map(drop)
    }

    pub async fn set_field(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Result<(), FieldError>, FormClosed> {
        let ack = self
            .send(FormEvent::ManualFieldEdited {
                name: name.into(),
                value: value.into(),
            })
            .await?;
        Ok(match ack {
            Ack::Field(result) => result,
            _ => Ok(()),
        })
    }

    pub async fn submit(&self) -> Result<SubmitAck, FormClosed> {
        let (reply, answer) = oneshot::channel();
        self.events
            .send(Message::Submit(reply))
            .map_err(|_| FormClosed)?;
        answer.await.map_err(|_| FormClosed)
    }

    /// Receiver notified after every applied event
    pub fn subscribe(&self) -> watch::Receiver<FormView> {
        self.view.clone()
    }

    /// Latest state of the form
    pub fn view(&self) -> FormView {
        self.view.borrow().clone()
    }

    /// Wait until no lookup or submission is outstanding, for at most
    /// `wait`. Returns the latest state either way.
    pub async fn settled(&self, wait: Duration) -> FormView {
        let mut view = self.view.clone();
        let settle = async {
            loop {
                {
                    let current = view.borrow_and_update();
                    if is_settled(&current) {
                        return current.clone();
                    }
                }
                if view.changed().await.is_err() {
                    return view.borrow().clone();
                }
            }
        };
        match tokio::time::timeout(wait, settle).await {
            Ok(view) => view,
            Err(_) => self.view(),
        }
    }
}
