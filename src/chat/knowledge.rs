//! Canned knowledge base for the analysis assistant.
//!
//! Matching is a plain substring search over lowercased input: the first
//! topic (in table order) with any matching keyword wins.

use rand::Rng;
use rand::seq::SliceRandom;

/// One subject the assistant can talk about.
#[derive(Debug)]
pub struct Topic {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub responses: &'static [&'static str],
}

pub static TOPICS: &[Topic] = &[
    Topic {
        name: "abc анализ",
        keywords: &["abc", "анализ abc", "категории", "классификация"],
        responses: &[
            "ABC анализ — это метод классификации товаров по степени их важности. Категория A (55% товаров, 80% оборота), B (30% товаров, 15% оборота), C (15% товаров, 5% оборота).",
            "ABC анализ помогает выделить наиболее важные товары для оптимизации складских запасов и логистики.",
            "Для проведения ABC анализа нужны данные: наименование товара, выручка или количество продаж за период.",
        ],
    },
    Topic {
        name: "xyz анализ",
        keywords: &["xyz", "анализ xyz", "стабильность", "спрос", "вариация"],
        responses: &[
            "XYZ анализ оценивает стабильность спроса. X — стабильный спрос, Y — сезонные колебания, Z — нерегулярный спрос.",
            "Комбинированный ABC-XYZ анализ дает полную картину: важность товара + предсказуемость спроса.",
            "XYZ категория определяется по коэффициенту вариации продаж.",
        ],
    },
    Topic {
        name: "логистика",
        keywords: &["логистика", "склад", "размещение", "запас", "зона"],
        responses: &[
            "Для категории A рекомендую размещение в золотой зоне (0.8-1.6 м от пола), страховой запас 30-40 дней, еженедельная инвентаризация.",
            "Категория B: средняя зона склада, запас 15-20 дней, инвентаризация раз в 2 недели.",
            "Категория C: удаленная зона, минимум запаса (7-10 дней) или работа под заказ, ежемесячная проверка.",
        ],
    },
    Topic {
        name: "привет",
        keywords: &["привет", "здравствуй", "добрый день", "здравствуйте", "hello", "hi"],
        responses: &[
            "Здравствуйте! Я аналитический помощник. Задавайте вопросы по ABC/XYZ анализу, логистике и оптимизации.",
            "Привет! Готов помочь с анализом товарных категорий и рекомендациями по складскому хранению.",
        ],
    },
    Topic {
        name: "помощь",
        keywords: &["помощь", "help", "что ты умеешь", "возможности", "функции"],
        responses: &[
            "Я могу помочь с: 1) ABC анализом 2) XYZ анализом 3) Логистическими рекомендациями 4) Интерпретацией результатов",
            "Задавайте вопросы про: категории товаров, размещение на складе, страховые запасы, анализ эффективности.",
        ],
    },
    Topic {
        name: "файл",
        keywords: &["файл", "excel", "загрузить", "формат", "данные", "выручка"],
        responses: &[
            "Для анализа загрузите Excel файл со столбцами: 'Наименование товара', 'Выручка (У.Е.)' и данные по кварталам.",
            "Формат файла: .xlsx или .xls. Обязательные поля: название товара и финансовые показатели.",
        ],
    },
];

/// Used when no topic matches.
pub static DEFAULT_RESPONSES: &[&str] = &[
    "Понял ваш вопрос. Могу уточнить: интересует ли вас ABC анализ, XYZ анализ или логистические рекомендации?",
    "Для более точного ответа уточните, пожалуйста, ваш вопрос. Например: 'Как провести ABC анализ?' или 'Какие рекомендации для категории A?'",
    "Загрузите данные в формате Excel для проведения полного анализа. Нужны столбцы: наименование товара и выручка.",
    "Рекомендую посмотреть раздел с рекомендациями по логистике для разных категорий товаров.",
];

static QUICK_REPLIES: &[&str] = &[
    "Что такое ABC анализ?",
    "Как проводить XYZ анализ?",
    "Рекомендации по логистике",
    "Какой формат файла нужен?",
    "Спасибо, понятно",
];

/// First topic whose keyword occurs in `input`, ignoring case.
pub fn classify(input: &str) -> Option<&'static Topic> {
    let message = input.to_lowercase();
    TOPICS
        .iter()
        .find(|topic| topic.keywords.iter().any(|kw| message.contains(kw)))
}

/// Pick a reply: a random response of the matched topic, else a random
/// default response.
pub fn generate_response<R: Rng + ?Sized>(input: &str, rng: &mut R) -> &'static str {
    let pool = classify(input).map_or(DEFAULT_RESPONSES, |t| t.responses);
    pool.choose(rng).copied().unwrap_or(DEFAULT_RESPONSES[0])
}

/// Canned prompts offered as one-click suggestions.
pub fn quick_replies() -> &'static [&'static str] {
    QUICK_REPLIES
}
