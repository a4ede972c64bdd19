//! Subcommands and the in-process peer that answers them.

use std::fmt;
use std::time::{Duration, Instant};

use clap::Subcommand;
use corelib::message::{
    DataSources, NoOp, Progress, Publish, PublishedItem, RequestConfig, RequestMode, RequestOptions,
};
use corelib::{Message, NodeId, Packet, ProcRef};
use messaging::{
    serve_requests, start_node, IdentityGate, LoopbackNetwork, MessagingConfig, StaticGate,
};
use tracing::info;
use uuid::Uuid;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Round-trip no-op messages
    Ping {
        #[arg(long, default_value_t = 1)]
        count: u32,

        #[arg(long, default_value = "ping")]
        note: String,
    },
    /// Ask the peer for its configuration
    Config,
    /// List the peer's published data sources
    Catalog {
        /// Include pipeline definitions
        #[arg(long, default_value_t = false)]
        full: bool,

        /// Restrict to one dataset version, `<uuid>[<version>]`
        #[arg(long)]
        proc_ref: Option<String>,
    },
    /// Publish a dataset version
    Publish {
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Fresh id when omitted
        #[arg(long)]
        dataset_id: Option<Uuid>,

        #[arg(long, default_value_t = 1)]
        version: i32,

        #[arg(long, default_value = "")]
        definition: String,
    },
}

/// Replies gathered by one command.
#[derive(Debug)]
pub struct CommandResult {
    pub replies: Vec<Packet>,
    pub elapsed: Duration,
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for reply in &self.replies {
            match &reply.message {
                Message::NoOp(noop) => writeln!(f, "{}: {}", reply.kind(), noop.note)?,
                Message::Progress(progress) => {
                    writeln!(f, "{}: {}", progress.reference, progress.progress_text)?
                }
                Message::DataSources(sources) => {
                    writeln!(f, "{} item(s)", sources.published_items.len())?;
                    for item in &sources.published_items {
                        writeln!(
                            f,
                            "  {} {} published={} processed={} {}",
                            item.proc_ref,
                            item.name,
                            item.published,
                            item.processed,
                            item.processing_progress
                        )?;
                        if !item.pipeline_definition.is_empty() {
                            writeln!(f, "    {}", item.pipeline_definition)?;
                        }
                    }
                }
                other => writeln!(f, "{}", other.name())?,
            }
        }
        write!(f, "{} reply(ies) in {:?}", self.replies.len(), self.elapsed)
    }
}

impl Command {
    /// The request messages this command sends, in order.
    pub fn requests(&self) -> anyhow::Result<Vec<Message>> {
        let requests = match self {
            Command::Ping { count, note } => (1..=*count)
                .map(|i| NoOp::new(format!("{note} #{i}")).into())
                .collect(),
            Command::Config => vec![RequestConfig.into()],
            Command::Catalog { full, proc_ref } => {
                let options = match (full, proc_ref) {
                    (_, Some(proc_ref)) => RequestOptions::full_for(proc_ref.parse::<ProcRef>()?),
                    (true, None) => RequestOptions::full(),
                    (false, None) => RequestOptions::summary(),
                };
                vec![DataSources {
                    published_items: Vec::new(),
                    options,
                }
                .into()]
            }
            Command::Publish {
                name,
                description,
                dataset_id,
                version,
                definition,
            } => vec![Publish {
                name: name.clone(),
                description: description.clone(),
                dataset_id: dataset_id.unwrap_or_else(Uuid::new_v4),
                version: *version,
                definition: definition.clone(),
            }
            .into()],
        };
        Ok(requests)
    }

    /// Start a local node and a peer on a loopback network, send this
    /// command's requests and collect the replies.
    pub async fn execute(
        &self,
        config: &MessagingConfig,
        gate: &dyn IdentityGate,
    ) -> anyhow::Result<CommandResult> {
        let requests = self.requests()?;

        let network = LoopbackNetwork::new(config.inbound_capacity.max(1));
        let local_id = NodeId::random();
        let peer_id = NodeId::random();
        let local = start_node(
            local_id,
            network.transport(),
            network.register(local_id),
            gate,
            config,
        )?;
        let peer = start_node(
            peer_id,
            network.transport(),
            network.register(peer_id),
            &StaticGate::allow(),
            config,
        )?;

        let catalog = sample_catalog();
        let default_timeout_ms = config.default_timeout_ms;
        let responder = tokio::spawn(serve_requests(
            peer.messenger.clone(),
            peer.requests,
            move |request| answer(&catalog, default_timeout_ms, request),
        ));

        info!(local = %local_id, peer = %peer_id, requests = requests.len(), "sending");
        let started = Instant::now();
        let mut replies = Vec::with_capacity(requests.len());
        for request in requests {
            replies.push(local.messenger.request(peer_id, request).await?);
        }
        let elapsed = started.elapsed();

        network.unregister(peer_id);
        network.unregister(local_id);
        let answered = responder.await?;
        info!(answered, ?elapsed, "done");

        Ok(CommandResult { replies, elapsed })
    }
}

/// Reply the in-process peer gives to `request`. `None` for messages that
/// are not requests.
pub fn answer(
    catalog: &[PublishedItem],
    default_timeout_ms: u64,
    request: &Packet,
) -> Option<Message> {
    match &request.message {
        Message::NoOp(noop) => Some(NoOp::new(noop.note.clone()).into()),
        Message::RequestConfig(_) => Some(
            Progress::new(
                "config",
                format!("default_timeout_ms={default_timeout_ms} items={}", catalog.len()),
            )
            .into(),
        ),
        Message::Publish(publish) => Some(
            Progress::new(publish.proc_ref().to_string(), format!("accepted {}", publish.name))
                .into(),
        ),
        Message::DataSources(query) => Some(catalog_reply(catalog, &query.options)),
        Message::Progress(_) => None,
    }
}

fn catalog_reply(catalog: &[PublishedItem], options: &RequestOptions) -> Message {
    let scope = match options.scope() {
        Ok(scope) => scope.map(|proc_ref| proc_ref.to_string()),
        Err(err) => {
            return Progress::new(options.data_source_proc_ref.clone(), err.to_string()).into()
        }
    };

    let published_items = catalog
        .iter()
        .filter(|item| scope.as_ref().map_or(true, |scope| &item.proc_ref == scope))
        .map(|item| match options.mode {
            RequestMode::Full => item.clone(),
            RequestMode::Summary => PublishedItem {
                pipeline_definition: String::new(),
                ..item.clone()
            },
        })
        .collect();

    DataSources {
        published_items,
        options: options.clone(),
    }
    .into()
}

fn sample_catalog() -> Vec<PublishedItem> {
    vec![
        PublishedItem {
            proc_ref: ProcRef::new(Uuid::from_u128(0x67e5_5044_10b1_426f_9247_bb68_0e5f_e0c8), 1)
                .to_string(),
            name: "river-gauges".into(),
            description: "Hourly gauge readings".into(),
            imported: true,
            published: true,
            downloaded: true,
            processed: true,
            processing_progress: "100%".into(),
            pipeline_definition: "ingest -> resample(1h) -> publish".into(),
        },
        PublishedItem {
            proc_ref: ProcRef::new(Uuid::from_u128(0x9a1c_33f0_5d2e_4b7a_8c61_0f4e_2b9d_7a15), 3)
                .to_string(),
            name: "land-cover".into(),
            description: "Classified tiles".into(),
            imported: true,
            published: false,
            downloaded: true,
            processed: false,
            processing_progress: "42%".into(),
            pipeline_definition: "tile -> classify -> mosaic".into(),
        },
    ]
}
