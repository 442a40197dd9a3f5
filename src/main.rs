use anyhow::Result;
use clap::{Parser, Subcommand};
use flexi_logger::Logger;
use secrecy::SecretString;
use tokio::select;
use url::Url;

use s3watch::config::{WatcherConfig, default_queue_name};
use s3watch::infra::ensure_notification;
use s3watch::queue::SqsQueue;
use s3watch::utils::{
    ClientSettings, create_s3_client, create_sqs_client, create_sts_client, list_buckets,
};
use s3watch::watcher::Watcher;

#[derive(Parser)]
#[command(
    name = "s3watch",
    version,
    about = "Watch an S3 bucket for object changes via SQS bucket notifications"
)]
struct Cli {
    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1", global = true)]
    region: String,

    /// Custom endpoint URL, e.g. a MinIO or LocalStack deployment
    #[arg(long, env = "AWS_ENDPOINT_URL", global = true)]
    endpoint_url: Option<Url>,

    /// Static access key id; falls back to the SDK's default provider chain
    #[arg(long, env = "AWS_ACCESS_KEY_ID", global = true)]
    access_key_id: Option<String>,

    /// Static secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true, global = true)]
    secret_access_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List buckets visible to the current credentials
    ListBuckets,

    /// Create the queue, queue policy, and bucket notification rule
    Setup {
        /// The bucket to configure notifications for
        bucket: String,

        /// Queue to deliver notifications to (default: "{bucket}-watch")
        #[arg(long)]
        queue_name: Option<String>,
    },

    /// Watch a bucket, printing one JSON event per object change
    Watch {
        /// The bucket to watch
        bucket: String,

        /// Only emit events for keys starting with this prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Poll this queue URL instead of resolving one by name
        #[arg(long)]
        queue_url: Option<Url>,

        /// Queue name to resolve (default: "{bucket}-watch")
        #[arg(long)]
        queue_name: Option<String>,

        /// Run notification setup before watching
        #[arg(long)]
        setup: bool,

        /// Long-poll wait per receive, also the idle sleep
        #[arg(long, default_value_t = 3)]
        wait_seconds: u32,

        /// Messages per receive, capped at 10 by SQS
        #[arg(long, default_value_t = 10)]
        max_messages: u32,

        /// Purge the queue before watching
        #[arg(long)]
        purge: bool,

        /// Delete the queue when the watcher shuts down
        #[arg(long)]
        delete_queue_on_close: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _logger = Logger::try_with_env_or_str("info")
        .expect("invalid log specification")
        .log_to_stderr()
        .start()
        .expect("failed to initialize logging");

    let cli = Cli::parse();

    let mut settings = ClientSettings::new(cli.region.clone());
    if let Some(endpoint_url) = cli.endpoint_url.clone() {
        settings = settings.with_endpoint_url(endpoint_url);
    }
    if let (Some(access_key_id), Some(secret_access_key)) =
        (cli.access_key_id.clone(), cli.secret_access_key.clone())
    {
        settings = settings.with_credentials(access_key_id, SecretString::from(secret_access_key));
    }

    match cli.command {
        Command::ListBuckets => {
            let s3 = create_s3_client(&settings).await;
            for bucket in list_buckets(&s3).await? {
                println!("{bucket}");
            }
            Ok(())
        }
        Command::Setup { bucket, queue_name } => {
            let queue_name = queue_name.unwrap_or_else(|| default_queue_name(&bucket));
            let s3 = create_s3_client(&settings).await;
            let sqs = create_sqs_client(&settings).await;
            let sts = create_sts_client(&settings).await;
            let queue_url =
                ensure_notification(&s3, &sqs, &sts, &bucket, &queue_name, &cli.region).await?;
            println!("{queue_url}");
            Ok(())
        }
        Command::Watch {
            bucket,
            prefix,
            queue_url,
            queue_name,
            setup,
            wait_seconds,
            max_messages,
            purge,
            delete_queue_on_close,
        } => {
            let sqs = create_sqs_client(&settings).await;
            let queue = match queue_url {
                Some(url) => SqsQueue::new(sqs.clone(), url.to_string()),
                None => {
                    let queue_name = queue_name.unwrap_or_else(|| default_queue_name(&bucket));
                    if setup {
                        let s3 = create_s3_client(&settings).await;
                        let sts = create_sts_client(&settings).await;
                        let url = ensure_notification(
                            &s3,
                            &sqs,
                            &sts,
                            &bucket,
                            &queue_name,
                            &cli.region,
                        )
                        .await?;
                        SqsQueue::new(sqs.clone(), url)
                    } else {
                        SqsQueue::from_name(sqs.clone(), &queue_name).await?
                    }
                }
            };

            let mut config = WatcherConfig::new(&bucket)
                .with_wait_seconds(wait_seconds)
                .with_max_messages_per_fetch(max_messages)
                .with_purge_before_watch(purge)
                .with_delete_queue_on_close(delete_queue_on_close);
            if let Some(prefix) = prefix {
                config = config.with_key_prefix(prefix);
            }

            log::info!(
                "Watching bucket {bucket} via queue {}",
                queue.get_queue_url()
            );
            let mut watcher = Watcher::spawn(queue, config);
            let mut failure = None;
            loop {
                select! {
                    _ = tokio::signal::ctrl_c() => {
                        log::info!("Interrupted. Shutting down.");
                        break;
                    }
                    maybe_event = watcher.next_event() => match maybe_event {
                        Some(Ok(event)) => println!("{}", serde_json::to_string(&event)?),
                        Some(Err(e)) => {
                            failure = Some(e);
                            break;
                        }
                        None => break,
                    }
                }
            }
            watcher.close().await;
            match failure {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }
}
