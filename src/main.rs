use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use consulta_fgts::historico::FiltroHistorico;
use consulta_fgts::model::{Ambiente, StatusConsulta, StatusProposta};
use consulta_fgts::propostas::{FiltroPropostas, NovaProposta};
use consulta_fgts::webhook::WebhookClient;
use consulta_fgts::{config, db, handlers};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    comando: Comando,
}

#[derive(Debug, Subcommand)]
enum Comando {
    /// Consulta individual de saldo FGTS
    Consultar {
        cpf: String,
        /// Imprime a resposta completa da API
        #[arg(long)]
        json: bool,
    },
    /// Importa um arquivo CSV de CPFs e cria uma campanha
    Importar {
        arquivo: PathBuf,
        /// Nome da campanha (padrão: nome do arquivo)
        #[arg(long)]
        nome: Option<String>,
    },
    /// Gerencia campanhas de consulta em lote
    #[command(subcommand)]
    Campanha(CampanhaCmd),
    /// Processa continuamente as campanhas em execução
    Worker,
    /// Histórico de consultas
    Historico {
        /// Busca o histórico no parceiro em vez do local
        #[arg(long)]
        remoto: bool,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        banco: Option<String>,
        /// Busca por CPF ou nome
        #[arg(long)]
        busca: Option<String>,
        /// Data inicial (AAAA-MM-DD)
        #[arg(long, value_parser = parse_data)]
        inicio: Option<NaiveDate>,
        /// Data final (AAAA-MM-DD), inclusiva
        #[arg(long, value_parser = parse_data)]
        fim: Option<NaiveDate>,
        /// Exporta para CSV em vez de listar
        #[arg(long)]
        exportar: Option<PathBuf>,
    },
    /// Clientes cadastrados
    #[command(subcommand)]
    Cliente(ClienteCmd),
    /// Protocolos e consultas em lote VCTEX
    #[command(subcommand)]
    Vctex(VctexCmd),
    /// Credenciais e token da API Facta
    #[command(subcommand)]
    Facta(FactaCmd),
    /// Propostas de empréstimo
    #[command(subcommand)]
    Proposta(PropostaCmd),
    /// Configuração
    #[command(subcommand)]
    Config(ConfigCmd),
}

#[derive(Debug, Subcommand)]
enum CampanhaCmd {
    /// Inicia (ou reinicia) uma campanha ociosa e processa até o fim
    Iniciar {
        id: i64,
        /// Também dispara o lote no parceiro
        #[arg(long)]
        remoto: bool,
    },
    /// Pausa uma campanha em execução
    Pausar { id: i64 },
    /// Retoma uma campanha pausada e processa até o fim
    Retomar { id: i64 },
    /// Para uma campanha; os resultados obtidos são mantidos
    Parar { id: i64 },
    /// Mostra o progresso de uma campanha, ou lista todas
    Status { id: Option<i64> },
    /// Exporta o estado atual de uma campanha para CSV
    Exportar {
        id: i64,
        #[arg(long)]
        saida: Option<PathBuf>,
    },
    /// Lista os lotes submetidos ao parceiro
    Lotes,
}

#[derive(Debug, Subcommand)]
enum ClienteCmd {
    /// Busca um cliente pelo CPF
    Buscar { cpf: String },
    /// Cadastra clientes a partir de um arquivo CSV
    Cadastrar { arquivo: PathBuf },
}

#[derive(Debug, Subcommand)]
enum VctexCmd {
    /// Lista os protocolos disponíveis
    Protocolos {
        #[arg(long)]
        protocolo: Option<String>,
        /// Filtra por data (AAAA-MM-DD)
        #[arg(long)]
        data: Option<String>,
    },
    /// Consulta os CPFs e o detalhe de um protocolo
    Consultar { protocolo: String },
}

#[derive(Debug, Subcommand)]
enum FactaCmd {
    /// Salva usuário, senha e ambiente
    Salvar {
        #[arg(long)]
        usuario: String,
        #[arg(long)]
        senha: String,
        /// homologacao ou producao
        #[arg(long, default_value = "homologacao", value_parser = parse_ambiente)]
        ambiente: Ambiente,
    },
    /// Gera um novo token (simulado, validade de 1 hora)
    Token,
    /// Mostra o token ativo e o tempo restante
    Status,
}

#[derive(Debug, Subcommand)]
enum PropostaCmd {
    /// Cadastra uma nova proposta
    Digitar {
        #[arg(long)]
        banco: String,
        #[arg(long)]
        cliente: String,
        #[arg(long)]
        cpf: String,
        /// Data de nascimento (AAAA-MM-DD)
        #[arg(long)]
        nascimento: String,
        /// Valor em reais, ex.: 5.000,00
        #[arg(long)]
        valor: String,
        #[arg(long)]
        prazo: Option<i64>,
        #[arg(long)]
        taxa: Option<f64>,
        #[arg(long)]
        telefone: Option<String>,
        #[arg(long)]
        observacoes: Option<String>,
    },
    /// Lista propostas com filtros e estatísticas
    Listar {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        banco: Option<String>,
        /// Busca por cliente ou CPF
        #[arg(long)]
        busca: Option<String>,
        #[arg(long, value_parser = parse_data)]
        inicio: Option<NaiveDate>,
        #[arg(long, value_parser = parse_data)]
        fim: Option<NaiveDate>,
    },
    /// Atualiza a situação de uma proposta
    Situacao {
        id: i64,
        /// pendente, em_analise, aprovada ou negada
        #[arg(value_parser = parse_status_proposta)]
        status: StatusProposta,
    },
    /// Exporta as propostas para CSV
    Exportar {
        #[arg(long)]
        saida: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCmd {
    /// Imprime um arquivo de configuração de exemplo
    Exemplo,
}

fn parse_data(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| format!("data inválida: {s}"))
}

fn parse_ambiente(s: &str) -> Result<Ambiente, String> {
    Ambiente::parse(s).ok_or_else(|| format!("ambiente inválido: {s}"))
}

fn parse_status_proposta(s: &str) -> Result<StatusProposta, String> {
    StatusProposta::parse(s).ok_or_else(|| format!("status inválido: {s}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    if let Comando::Config(ConfigCmd::Exemplo) = &cli.comando {
        print!("{}", config::example());
        return Ok(());
    }

    let cfg = config::load(Some(&cli.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/consultas.db", cfg.app.data_dir));
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let api = WebhookClient::from_config(&cfg);
    let tick = Duration::from_millis(cfg.app.poll_interval_ms);

    match cli.comando {
        Comando::Consultar { cpf, json } => handlers::consultar(&pool, &api, &cpf, json).await?,
        Comando::Importar { arquivo, nome } => {
            let nome = nome.unwrap_or_else(|| {
                let base = arquivo
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("importacao");
                format!("Campanha {base}")
            });
            handlers::importar(&pool, &api, &arquivo, &nome).await?;
        }
        Comando::Campanha(cmd) => match cmd {
            CampanhaCmd::Iniciar { id, remoto } => {
                handlers::campanha_iniciar(&pool, &api, id, remoto, tick).await?
            }
            CampanhaCmd::Pausar { id } => handlers::campanha_pausar(&pool, id).await?,
            CampanhaCmd::Retomar { id } => {
                handlers::campanha_retomar(&pool, &api, id, tick).await?
            }
            CampanhaCmd::Parar { id } => handlers::campanha_parar(&pool, id).await?,
            CampanhaCmd::Status { id } => handlers::campanha_status(&pool, id).await?,
            CampanhaCmd::Exportar { id, saida } => {
                handlers::campanha_exportar(&pool, id, saida.as_deref()).await?
            }
            CampanhaCmd::Lotes => handlers::campanha_lotes(&api).await?,
        },
        Comando::Worker => handlers::worker(&pool, &api, tick).await?,
        Comando::Historico {
            remoto,
            status,
            banco,
            busca,
            inicio,
            fim,
            exportar,
        } => {
            if remoto {
                handlers::historico_remoto(&api).await?;
            } else {
                let status = match status.as_deref() {
                    None | Some("todos") => None,
                    Some(s) => Some(
                        StatusConsulta::parse(s)
                            .ok_or_else(|| anyhow::anyhow!("status inválido: {s}"))?,
                    ),
                };
                let filtro = FiltroHistorico {
                    status,
                    banco,
                    busca,
                    inicio,
                    fim,
                };
                handlers::historico_local(&pool, &filtro, exportar.as_deref()).await?;
            }
        }
        Comando::Cliente(cmd) => match cmd {
            ClienteCmd::Buscar { cpf } => handlers::cliente_buscar(&api, &cpf).await?,
            ClienteCmd::Cadastrar { arquivo } => {
                handlers::clientes_cadastrar(&api, &arquivo).await?
            }
        },
        Comando::Vctex(cmd) => match cmd {
            VctexCmd::Protocolos { protocolo, data } => {
                handlers::vctex_protocolos(&api, protocolo.as_deref(), data.as_deref()).await?
            }
            VctexCmd::Consultar { protocolo } => {
                handlers::vctex_consultar(&api, &protocolo).await?
            }
        },
        Comando::Facta(cmd) => match cmd {
            FactaCmd::Salvar {
                usuario,
                senha,
                ambiente,
            } => handlers::facta_salvar(&pool, &usuario, &senha, ambiente).await?,
            FactaCmd::Token => handlers::facta_token(&pool, &cfg).await?,
            FactaCmd::Status => handlers::facta_status(&pool).await?,
        },
        Comando::Proposta(cmd) => match cmd {
            PropostaCmd::Digitar {
                banco,
                cliente,
                cpf,
                nascimento,
                valor,
                prazo,
                taxa,
                telefone,
                observacoes,
            } => {
                let nova = NovaProposta {
                    cliente,
                    cpf,
                    banco,
                    valor,
                    prazo,
                    taxa,
                    data_nascimento: nascimento,
                    telefone,
                    observacoes,
                };
                handlers::proposta_digitar(&pool, &nova).await?;
            }
            PropostaCmd::Listar {
                status,
                banco,
                busca,
                inicio,
                fim,
            } => {
                let status = match status.as_deref() {
                    None | Some("todos") => None,
                    Some(s) => Some(
                        StatusProposta::parse(s)
                            .ok_or_else(|| anyhow::anyhow!("status inválido: {s}"))?,
                    ),
                };
                let filtro = FiltroPropostas {
                    status,
                    banco,
                    busca,
                    inicio,
                    fim,
                };
                handlers::proposta_listar(&pool, &filtro).await?;
            }
            PropostaCmd::Situacao { id, status } => {
                handlers::proposta_situacao(&pool, id, status).await?
            }
            PropostaCmd::Exportar { saida } => {
                handlers::proposta_exportar(&pool, saida.as_deref()).await?
            }
        },
        Comando::Config(ConfigCmd::Exemplo) => unreachable!("handled before config load"),
    }

    Ok(())
}
