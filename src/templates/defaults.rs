//! Built-in prompt template set.
//!
//! Used whenever no templates have been saved, and restored by
//! [`TemplateRegistry::reset_to_defaults`](super::TemplateRegistry::reset_to_defaults).

use super::PromptTemplate;

/// System-role instruction shared by templates that do not define their own.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str =
    "당신은 전문 클래식 해설가다. 클래식 초보도 이해할 수 있게 설명한다.";

const LISTENING_GUIDE: &str = r#"곡명: {track_title}
작곡가: {composer}

### 🎵 감상 가이드

이 곡을 처음 듣는 분들을 위한 감상 포인트를 안내해드립니다:

**들어보세요:**
- 곡의 시작부터 끝까지의 감정 변화와 흐름
- 주요 멜로디가 어떻게 반복되고 변화하는지
- 악기들 간의 대화와 조화

**느껴보세요:**
- 이 곡이 표현하고자 하는 감정과 분위기
- 작곡가가 음악으로 그려낸 이야기나 풍경
- 클래식 음악만이 가진 깊이와 아름다움

200자 내외로 초보자도 쉽게 이해할 수 있도록 따뜻하고 친근한 톤으로 작성해주세요."#;

const OVERVIEW: &str = r#"곡명: {track_title}
작곡가: {composer}

### 📖 기본 설명

이 곡에 대한 기본 정보를 알려드립니다:

**기본 정보:**
- 곡의 형식과 구조 (소나타, 교향곡, 협주곡 등)
- 작곡 연도와 시대적 배경
- 연주 편성 (독주, 실내악, 관현악 등)

**특징:**
- 이 곡만의 독특한 특색과 매력
- 클래식 음악사에서의 의미와 위치
- 현재까지도 사랑받는 이유

클래식 초보자가 이해하기 쉽도록 전문 용어는 쉽게 풀어서 200자 내외로 설명해주세요."#;

const MUSICAL_FEATURES: &str = r#"곡명: {track_title}
작곡가: {composer}

### 🎼 음악적 특징

이 곡의 음악적 요소와 기법을 분석해드립니다:

**음악적 구조:**
- 조성, 박자, 템포의 특징
- 주요 주제와 모티프의 전개 방식
- 형식적 구조와 악장 구성

**연주 기법:**
- 특별한 연주 기법이나 표현법
- 악기별 역할과 상호작용
- 기술적 난이도와 표현의 포인트

**혁신적 요소:**
- 당시로서는 새로웠던 음악적 시도
- 후대에 미친 영향과 의미

음악 전공자나 애호가들도 흥미롭게 읽을 수 있도록 전문적이지만 이해하기 쉽게 200자 내외로 작성해주세요."#;

const HISTORICAL_CONTEXT: &str = r#"곡명: {track_title}
작곡가: {composer}

### 🏛️ 역사적 배경

이 곡이 탄생한 시대적 배경과 문화적 맥락을 알아봅니다:

**시대적 배경:**
- 작곡 당시의 사회적, 정치적 상황
- 해당 시대의 음악 경향과 유행
- 작곡가가 처한 개인적 상황과 환경

**문화적 의미:**
- 당시 사회에서 이 곡이 갖는 의미
- 초연 당시의 반응과 평가
- 시대를 넘나드는 보편적 가치

**영향과 의의:**
- 음악사에서의 위치와 중요성
- 후대 작곡가들에게 미친 영향
- 오늘날까지 이어지는 의미

역사적 맥락을 통해 곡을 더 깊이 이해할 수 있도록 200자 내외로 설명해주세요."#;

const COMPOSER_PROFILE: &str = r#"곡명: {track_title}
작곡가: {composer}

### 👨‍🎼 작곡가 설명

{composer}에 대해 알아보고, 이 곡과의 연관성을 살펴봅니다:

**작곡가 소개:**
- 생애와 주요 경력, 음악적 여정
- 대표작품과 음악적 스타일의 특징
- 개성적인 작곡 기법과 표현 방식

**이 곡과의 관계:**
- 작곡가 생애에서 이 곡이 갖는 의미
- 작곡 당시의 개인적 상황과 영감의 원천
- 작곡가의 다른 작품들과의 비교

**음악적 유산:**
- 클래식 음악사에서의 위치
- 후대에 미친 영향과 의미
- 현재까지도 사랑받는 이유

작곡가의 인간적 면모와 음악적 천재성을 모두 느낄 수 있도록 200자 내외로 친근하게 설명해주세요."#;

/// `(name, body)` pairs in display order.
const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    ("감상 가이드", LISTENING_GUIDE),
    ("기본 설명", OVERVIEW),
    ("음악적 특징", MUSICAL_FEATURES),
    ("역사적 배경", HISTORICAL_CONTEXT),
    ("작곡가 설명", COMPOSER_PROFILE),
];

pub fn default_templates() -> Vec<PromptTemplate> {
    DEFAULT_TEMPLATES
        .iter()
        .map(|(name, body)| PromptTemplate {
            name: name.to_string(),
            body: body.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        })
        .collect()
}
