use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use mathwiz_client::app::App;
use mathwiz_client::config::Config;
use mathwiz_client::logger;
use mathwiz_client::models::{
    BookmarkCreate, Credentials, CsQuestion, ExplainKind, LearningAid, LearningAidType, SolutionResult,
    UploadFile,
};
use mathwiz_client::services::{LogNavigator, Route};
use mathwiz_client::workflow::RouteGate;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "mathwiz", version, about = "MathWiz 辅导客户端")]
struct Cli {
    /// 配置文件（TOML），环境变量优先
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 显示详细日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 登录
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// 登出
    Logout,
    /// 查看当前用户和经验值
    Whoami,
    /// 注册新用户
    Register {
        name: String,
        email: String,
        #[arg(long)]
        password: String,
    },
    /// 分步解题，可以先识别图片
    Solve {
        text: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
        /// 追问的步骤号，可重复
        #[arg(long)]
        explain: Vec<u32>,
        #[arg(long, default_value = "why")]
        kind: ExplainKind,
    },
    /// 与 AI 对话（从标准输入逐行提问，空行结束）
    Chat {
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// 诊断自己的解题步骤
    Diagnose { problem: String, steps: String },
    /// 生成练习题
    Practice {
        topic: String,
        #[arg(long)]
        previous: Option<String>,
    },
    /// 函数作图
    Graph { equation: String },
    /// 朗读文本，保存为 MP3
    Speak {
        text: String,
        #[arg(long, default_value = "speech.mp3")]
        out: PathBuf,
    },
    /// 收藏夹
    Bookmarks {
        #[command(subcommand)]
        action: BookmarkAction,
    },
    /// 每日一题
    Puzzle {
        #[command(subcommand)]
        action: PuzzleAction,
    },
    /// 计算机科学练习
    Cs {
        #[command(subcommand)]
        action: CsAction,
    },
    /// 检查后端是否可用
    Health,
}

#[derive(Subcommand)]
enum BookmarkAction {
    List {
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    Add {
        text: String,
        #[arg(long)]
        source: Option<String>,
    },
    Remove { id: i64 },
}

#[derive(Subcommand)]
enum PuzzleAction {
    Show,
    Answer { puzzle_id: String, answer: String },
}

#[derive(Subcommand)]
enum CsAction {
    /// 按章节出题，给出 --answer 时直接提交
    Question {
        chapter: String,
        #[arg(long)]
        answer: Option<String>,
    },
    /// 学习资料：flashcards / summary / key_points
    Aid {
        chapter: String,
        #[arg(long, default_value = "summary")]
        kind: LearningAidType,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::load(cli.config.as_deref())?;

    // 初始化日志
    if cli.verbose || config.verbose_logging {
        logger::init_verbose();
    } else {
        logger::init();
    }

    let app = App::initialize(config)?;
    run(&app, cli.command).await
}

async fn run(app: &App, command: Command) -> Result<()> {
    let cancel = CancellationToken::new();
    match command {
        Command::Login { email, password } => {
            let user = app.session().login(&Credentials::new(email, password)).await?;
            println!("欢迎，{}", user.display_name());
        }
        Command::Logout => app.session().logout(),
        Command::Whoami => {
            require_login(app, Route::Dashboard)?;
            let profile = app.account().me(&cancel).await?;
            println!(
                "{} <{}>  经验值 {}",
                profile.name.as_deref().unwrap_or("-"),
                profile.email,
                profile.current_xp
            );
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            let message = app.account().register(&name, &email, &password, &cancel).await?;
            println!("{}", message);
        }
        Command::Solve {
            text,
            image,
            explain,
            kind,
        } => {
            require_login(app, Route::Solver)?;
            solve(app, text, image.as_deref(), &explain, kind).await?;
        }
        Command::Chat { image } => {
            require_login(app, Route::Chat)?;
            chat(app, image.as_deref()).await?;
        }
        Command::Diagnose { problem, steps } => {
            require_login(app, Route::Solver)?;
            let diagnosis = app.tutor().diagnose(&problem, &steps, &cancel).await?;
            println!("{}", diagnosis.feedback);
        }
        Command::Practice { topic, previous } => {
            require_login(app, Route::Solver)?;
            let problem = app
                .tutor()
                .practice(&topic, previous.as_deref(), &cancel)
                .await?;
            println!("{}", problem.problem.unwrap_or_default());
            if let Some(explanation) = problem.solution_explanation {
                println!("\n解析:\n{}", explanation);
            }
        }
        Command::Graph { equation } => {
            require_login(app, Route::Solver)?;
            let data_url = app.tutor().graph(&equation, &cancel).await?;
            println!("{}", data_url);
        }
        Command::Speak { text, out } => {
            let audio = app.tutor().text_to_speech(&text, &cancel).await?;
            tokio::fs::write(&out, audio)
                .await
                .with_context(|| format!("无法写入 {}", out.display()))?;
            println!("已保存到 {}", out.display());
        }
        Command::Bookmarks { action } => {
            require_login(app, Route::Bookmarks)?;
            bookmarks(app, action, &cancel).await?;
        }
        Command::Puzzle { action } => {
            require_login(app, Route::Dashboard)?;
            match action {
                PuzzleAction::Show => {
                    let puzzle = app.puzzles().daily(&cancel).await?;
                    println!(
                        "[{}] ({}) {}",
                        puzzle.puzzle_id,
                        puzzle.difficulty.as_deref().unwrap_or("-"),
                        puzzle.question
                    );
                }
                PuzzleAction::Answer { puzzle_id, answer } => {
                    let verdict = app.puzzles().submit(&puzzle_id, &answer, &cancel).await?;
                    println!("{}", verdict.message);
                    if let Some(correct) = verdict.correct_answer.filter(|_| !verdict.is_correct) {
                        println!("正确答案: {}", correct);
                    }
                }
            }
        }
        Command::Cs { action } => {
            require_login(app, Route::CsPractice)?;
            cs(app, action, &cancel).await?;
        }
        Command::Health => {
            let health = app.api().health().await?;
            println!("{}", health.status);
        }
    }
    Ok(())
}

fn require_login(app: &App, route: Route) -> Result<()> {
    RouteGate::require(&app.session().snapshot(), route, &LogNavigator)
        .context("mathwiz login <email> --password <password>")
}

async fn load_upload(path: &Path) -> Result<UploadFile> {
    UploadFile::from_path(path)
        .await
        .with_context(|| format!("无法读取 {}", path.display()))
}

async fn solve(
    app: &App,
    text: Option<String>,
    image: Option<&Path>,
    explain: &[u32],
    kind: ExplainKind,
) -> Result<()> {
    let flow = app.solve_flow();
    if let Some(text) = text {
        flow.set_input(text);
    }
    if let Some(path) = image {
        let extracted = flow.select_file(load_upload(path).await?).await?;
        println!("识别结果:\n{}\n", extracted);
    }

    let result = flow.submit().await?;
    print_solution(&result);

    // 各步骤的追问互不影响，一起发出
    let outcomes = join_all(explain.iter().map(|&step| flow.explain_step(step, kind))).await;
    for (step, outcome) in explain.iter().zip(outcomes) {
        match outcome {
            Ok(text) => println!("\n第 {} 步 ({}): {}", step, kind.as_str(), text),
            Err(e) => eprintln!("\n第 {} 步追问失败: {}", step, e.user_message()),
        }
    }
    flow.close();
    Ok(())
}

fn print_solution(result: &SolutionResult) {
    if let Some(problem) = &result.original_problem {
        println!("题目: {}", problem);
    }
    for step in result.ordered_steps() {
        println!("{}. {}", step.step_number, step.explanation);
    }
    if let Some(answer) = &result.final_answer {
        println!("答案: {}", answer);
    }
}

async fn chat(app: &App, image: Option<&Path>) -> Result<()> {
    let flow = app.chat_flow();
    let mut context = match image {
        Some(path) => {
            let extracted = flow.select_file(load_upload(path).await?).await?;
            println!("识别结果:\n{}\n", extracted);
            Some(extracted)
        }
        None => None,
    };

    println!("输入问题，空行结束");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        // 识别出的图片内容只随第一个问题发送
        let question = match context.take() {
            Some(extracted) => format!("{}\n{}", extracted, line),
            None => line.to_string(),
        };
        flow.set_input(question);
        match flow.submit().await {
            Ok(answer) => println!("AI: {}\n", answer),
            Err(e) => eprintln!("⚠️ {}\n", e.user_message()),
        }
    }
    flow.close();
    Ok(())
}

async fn bookmarks(app: &App, action: BookmarkAction, cancel: &CancellationToken) -> Result<()> {
    let service = app.bookmarks();
    match action {
        BookmarkAction::List { skip, limit } => {
            for bookmark in service.list(skip, limit, cancel).await? {
                println!(
                    "#{} [{}] {}",
                    bookmark.id,
                    bookmark.created_at.format("%Y-%m-%d %H:%M"),
                    bookmark.question_text
                );
            }
        }
        BookmarkAction::Add { text, source } => {
            let mut create = BookmarkCreate::new(text);
            if let Some(source) = source {
                create = create.with_source(source);
            }
            let created = service.create(&create, cancel).await?;
            println!("已收藏 #{}", created.id);
        }
        BookmarkAction::Remove { id } => service.delete(id, cancel).await?,
    }
    Ok(())
}

async fn cs(app: &App, action: CsAction, cancel: &CancellationToken) -> Result<()> {
    match action {
        CsAction::Question { chapter, answer } => {
            let question = app.cs().questions(&chapter, None, cancel).await?;
            print_cs_question(&question);
            if let Some(answer) = answer {
                let flow = app.cs_submission_flow(question);
                flow.set_input(answer);
                let feedback = flow.submit().await?;
                println!("\n{}", if feedback.correct { "✓ 正确" } else { "✗ 错误" });
                println!("{}", feedback.explanation);
                for extra in [&feedback.detailed_solution, &feedback.ai_feedback, &feedback.simulated_output]
                    .into_iter()
                    .flatten()
                {
                    println!("\n{}", extra);
                }
            }
        }
        CsAction::Aid { chapter, kind } => match app.cs().learning_aid(&chapter, kind, cancel).await? {
            LearningAid::Flashcards { flashcards, .. } => {
                for card in flashcards {
                    println!("Q: {}\nA: {}\n", card.question, card.answer);
                }
            }
            LearningAid::Summary { summary_text, .. } => println!("{}", summary_text),
            LearningAid::KeyPoints { key_points, .. } => {
                for point in key_points {
                    println!("- {}", point);
                }
            }
        },
    }
    Ok(())
}

fn print_cs_question(question: &CsQuestion) {
    println!("[{}] {}", question.id(), question.question_text());
    if let Some(options) = question.options() {
        for option in options {
            println!("  {}) {}", option.id, option.text);
        }
    }
    if let CsQuestion::Coding {
        initial_code_stub: Some(stub),
        ..
    } = question
    {
        println!("\n{}", stub);
    }
}
