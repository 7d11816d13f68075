use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Broker error
    #[error(transparent)]
    Broker(#[from] ministack_broker::Error),

    /// Cluster error
    #[error(transparent)]
    Cluster(#[from] ministack_cluster::Error),

    /// Coordinator error
    #[error(transparent)]
    Coordinator(#[from] ministack_coordinator::Error),

    /// IO error
    #[error("{0}: {1}")]
    Io(&'static str, #[source] std::io::Error),

    /// Property resolution error
    #[error(transparent)]
    Properties(#[from] ministack_properties::Error),

    /// Could not set global default subscriber.
    #[error("could not set global default subscriber: {0}")]
    SetTracing(#[from] tracing::dispatcher::SetGlobalDefaultError),

    /// SQL gateway error
    #[error(transparent)]
    SqlGateway(#[from] ministack_sql_gateway::Error),
}
