use opentelemetry::otel_warn;
use opentelemetry_config::{otlp_var, Environment, Signal};
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Transport security of a gRPC channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelCredentials {
    /// Plaintext connection.
    Insecure,
    /// TLS connection.
    Secure(TlsCredentials),
}

impl ChannelCredentials {
    /// TLS with the platform trust roots and no client identity.
    pub fn secure() -> Self {
        ChannelCredentials::Secure(TlsCredentials::default())
    }

    /// Whether the channel uses TLS.
    pub fn is_secure(&self) -> bool {
        matches!(self, ChannelCredentials::Secure(_))
    }
}

/// PEM encoded material for a TLS channel.
///
/// The client key and certificate are either both present or both absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TlsCredentials {
    /// Trust root replacing the platform roots.
    pub root_certificate: Option<Vec<u8>>,
    /// Private key of the client identity.
    pub client_key: Option<Vec<u8>>,
    /// Certificate chain of the client identity.
    pub client_certificate: Option<Vec<u8>>,
}

impl Debug for TlsCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsCredentials")
            .field("root_certificate", &self.root_certificate.is_some())
            .field("client_key", &self.client_key.is_some())
            .field("client_certificate", &self.client_certificate.is_some())
            .finish()
    }
}

#[cfg(feature = "tls")]
impl From<&TlsCredentials> for tonic::transport::ClientTlsConfig {
    fn from(credentials: &TlsCredentials) -> Self {
        use tonic::transport::{Certificate, Identity};

        let mut config = tonic::transport::ClientTlsConfig::new();
        if let Some(root) = &credentials.root_certificate {
            config = config.ca_certificate(Certificate::from_pem(root));
        }
        if let (Some(key), Some(certificate)) =
            (&credentials.client_key, &credentials.client_certificate)
        {
            config = config.identity(Identity::from_pem(certificate, key));
        }
        config
    }
}

/// Files holding PEM encoded TLS material, relative paths resolved against
/// the working directory of the [`Environment`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CertificatePaths {
    /// Trust root file.
    pub certificate: Option<PathBuf>,
    /// Client private key file.
    pub client_key: Option<PathBuf>,
    /// Client certificate chain file.
    pub client_certificate: Option<PathBuf>,
}

/// Produces the credentials of a channel each time one is created.
pub type CredentialsFactory = Arc<dyn Fn() -> ChannelCredentials + Send + Sync>;

const INCOMPLETE_CLIENT_IDENTITY: &str = "Client key and certificate must both be provided, but one was missing - attempting to create credentials from just the root certificate";

/// Chooses channel credentials for a gRPC exporter.
///
/// In order of precedence:
///
/// 1. credentials passed by user code,
/// 2. plaintext when the endpoint uses `http://`,
/// 3. TLS when it uses `https://`, built from the files set through
///    [`CredentialResolver::with_certificate_paths`], each falling back to
///    `OTEL_EXPORTER_OTLP_[SIGNAL_]<CERTIFICATE|CLIENT_KEY|CLIENT_CERTIFICATE>`,
/// 4. otherwise plaintext if the insecure flag set through
///    [`CredentialResolver::with_insecure`], or else
///    `OTEL_EXPORTER_OTLP_[SIGNAL_]INSECURE`, is `true`, TLS if not.
#[derive(Clone, Debug)]
pub struct CredentialResolver<'a> {
    env: &'a Environment,
    signal: Signal,
    insecure: Option<bool>,
    paths: CertificatePaths,
}

impl<'a> CredentialResolver<'a> {
    /// Creates a resolver reading `signal` specific and generic variables from `env`.
    pub fn new(env: &'a Environment, signal: Signal) -> Self {
        CredentialResolver {
            env,
            signal,
            insecure: None,
            paths: CertificatePaths::default(),
        }
    }

    /// Certificate files taking precedence over the certificate variables.
    pub fn with_certificate_paths(mut self, paths: CertificatePaths) -> Self {
        self.paths = paths;
        self
    }

    /// Overrides the insecure flag of the environment. Only consulted for
    /// endpoints without a scheme.
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = Some(insecure);
        self
    }

    /// Resolves the credentials for `endpoint`, the endpoint before
    /// normalization. Certificate files are read once, here.
    pub fn resolve(
        &self,
        endpoint: &str,
        explicit: Option<ChannelCredentials>,
    ) -> CredentialsFactory {
        let credentials = self.resolve_credentials(endpoint, explicit);
        Arc::new(move || credentials.clone())
    }

    /// Like [`CredentialResolver::resolve`], returning the value directly.
    pub fn resolve_credentials(
        &self,
        endpoint: &str,
        explicit: Option<ChannelCredentials>,
    ) -> ChannelCredentials {
        if let Some(credentials) = explicit {
            return credentials;
        }
        let endpoint = endpoint.trim();
        if starts_with_ignore_case(endpoint, "http://") {
            ChannelCredentials::Insecure
        } else if starts_with_ignore_case(endpoint, "https://") || !self.insecure() {
            ChannelCredentials::Secure(self.tls())
        } else {
            ChannelCredentials::Insecure
        }
    }

    fn insecure(&self) -> bool {
        self.insecure
            .or_else(|| self.env.get_bool(&otlp_var(Some(self.signal), "INSECURE")))
            .or_else(|| self.env.get_bool(&otlp_var(None, "INSECURE")))
            .unwrap_or(false)
    }

    fn tls(&self) -> TlsCredentials {
        let root_certificate = self.read_file("CERTIFICATE", self.paths.certificate.as_deref());
        let client_key = self.read_file("CLIENT_KEY", self.paths.client_key.as_deref());
        let client_certificate =
            self.read_file("CLIENT_CERTIFICATE", self.paths.client_certificate.as_deref());

        if client_key.is_some() != client_certificate.is_some() {
            otel_warn!(
                name: "Config.Grpc.IncompleteClientIdentity",
                message = INCOMPLETE_CLIENT_IDENTITY
            );
            return TlsCredentials {
                root_certificate,
                ..Default::default()
            };
        }
        TlsCredentials {
            root_certificate,
            client_key,
            client_certificate,
        }
    }

    fn read_file(&self, name: &str, configured: Option<&Path>) -> Option<Vec<u8>> {
        let (source, path) = match configured {
            Some(path) => (name.to_ascii_lowercase(), self.env.resolve_path(path)),
            None => [otlp_var(Some(self.signal), name), otlp_var(None, name)]
                .into_iter()
                .find_map(|var| {
                    let path = self.env.resolve_path(self.env.get(&var)?);
                    Some((var, path))
                })?,
        };
        match std::fs::read(&path) {
            Ok(content) => Some(content),
            Err(err) => {
                otel_warn!(
                    name: "Config.Grpc.CertificateReadFailed",
                    message = format!("Failed to read {source} file '{}': {err}", path.display())
                );
                None
            }
        }
    }
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
