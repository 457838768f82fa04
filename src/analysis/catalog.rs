use crate::patd::RegulatoryItem;

pub const ITEMS: [&str; 99] = [
    "faltar à verdade",
    "utilizar-se do anonimato",
    "concorrer para a discórdia ou desarmonia entre militares",
    "deixar de comunicar ao superior a execução de ordem recebida",
    "não levar ao conhecimento de autoridade competente falta ou irregularidade que presenciar ou de que tiver ciência",
    "deixar de cumprir ou de fazer cumprir normas regulamentares na esfera de suas atribuições",
    "deixar de cumprir ordem recebida",
    "retardar a execução de qualquer ordem",
    "aconselhar ou concorrer para não ser cumprida qualquer ordem de autoridade competente",
    "deixar de executar serviço para o qual tenha sido escalado",
    "faltar ao serviço para o qual tenha sido escalado",
    "abandonar o serviço para o qual tenha sido designado",
    "permutar serviço sem permissão da autoridade competente",
    "chegar atrasado ao serviço, à formatura ou a ato para o qual tenha sido convocado",
    "deixar de comparecer a formatura, instrução ou ato para o qual tenha sido convocado",
    "ausentar-se, sem licença, do local onde deva permanecer",
    "deixar de se apresentar, finda a licença, férias ou dispensa, no prazo regulamentar",
    "deixar de participar, a tempo, à autoridade a que estiver subordinado, a impossibilidade de comparecer ao serviço",
    "faltar a missão para a qual tenha sido designado",
    "dormir em serviço",
    "afastar-se do posto de serviço sem autorização",
    "deixar de cumprir as prescrições relativas ao serviço de sentinela ou vigia",
    "permitir a entrada de pessoa não autorizada em área restrita",
    "deixar de exercer a fiscalização que lhe competir",
    "apresentar-se em serviço com uniforme em desalinho ou incompleto",
    "usar uniforme em desacordo com o regulamento de uniformes",
    "usar traje civil quando obrigado ao uso do uniforme",
    "apresentar-se com cabelo, barba ou bigode em desacordo com as normas",
    "deixar de prestar a continência regulamentar",
    "deixar de corresponder a cumprimento de subordinado",
    "tratar superior hierárquico de modo desrespeitoso",
    "tratar subordinado com injustiça ou de forma ofensiva",
    "dirigir-se a superior de forma inconveniente ou em termos impróprios",
    "censurar ato de superior ou procurar desconsiderá-lo",
    "discutir ou provocar discussão sobre assunto político, religioso ou de caráter ofensivo em área militar",
    "provocar ou tomar parte em rixa ou discussão no interior de organização militar",
    "ofender a moral ou os bons costumes por atos, gestos ou palavras",
    "proferir palavras obscenas ou de baixo calão em área militar",
    "embriagar-se ou apresentar-se embriagado",
    "consumir bebida alcoólica em serviço ou em área onde seja vedado",
    "fazer uso de substância entorpecente ou que determine dependência",
    "portar arma sem autorização ou em desacordo com as normas",
    "disparar arma por imprudência ou negligência",
    "deixar de zelar pela conservação do armamento sob sua responsabilidade",
    "extraviar ou danificar material da Fazenda Nacional sob sua responsabilidade",
    "utilizar material ou viatura da organização para fim particular",
    "conduzir viatura militar sem habilitação ou sem autorização",
    "conduzir viatura com imprudência ou em desacordo com as normas de trânsito",
    "deixar de comunicar acidente com viatura ou material sob sua responsabilidade",
    "contrair dívidas ou assumir compromissos superiores às suas possibilidades, comprometendo o nome da classe",
    "deixar de saldar dívida legalmente contraída",
    "realizar transação comercial em área militar sem autorização",
    "solicitar ou aceitar vantagem indevida em razão da função",
    "fazer uso indevido de documento ou de informação de caráter sigiloso",
    "divulgar, sem autorização, assunto de caráter sigiloso ou reservado",
    "publicar ou contribuir para que se publiquem fatos ou documentos que possam concorrer para o desprestígio da Instituição",
    "manifestar-se publicamente sobre assunto de natureza político-partidária",
    "utilizar redes sociais para expor a Instituição, superiores ou pares de forma depreciativa",
    "deixar de portar documento de identificação militar",
    "emprestar ou ceder documento de identificação militar",
    "rasurar, adulterar ou inutilizar documento oficial",
    "apresentar atestado ou documento inidôneo para obter dispensa",
    "simular doença para esquivar-se do serviço ou da instrução",
    "deixar de cumprir prescrição médica ou de comparecer a inspeção de saúde",
    "deixar de zelar pela própria saúde e higiene pessoal",
    "deixar de manter limpo e em ordem o alojamento ou o local de trabalho",
    "fumar em local onde seja proibido",
    "introduzir ou permitir a entrada de material proibido em organização militar",
    "retirar, sem autorização, objeto ou material de organização militar",
    "entrar ou sair de organização militar por local não permitido",
    "permanecer em organização militar fora do expediente sem autorização",
    "receber visitas em serviço sem autorização",
    "utilizar telefone celular ou equipamento eletrônico em serviço quando vedado",
    "desrespeitar regras de circulação e estacionamento em área militar",
    "comparecer a local incompatível com o decoro da classe",
    "frequentar, uniformizado, local incompatível com a condição de militar",
    "andar armado, em trajes civis, sem autorização",
    "deixar de observar as normas de segurança de voo ou de terra",
    "deixar de cumprir as normas de segurança de instalações e de informações",
    "deixar de tomar as providências cabíveis em relação a subordinado que cometer transgressão",
    "punir subordinado com punição não prevista ou de forma excessiva",
    "deixar de punir subordinado que cometer transgressão disciplinar",
    "dar ordem ilegal ou inexequível",
    "apropriar-se de bem alheio no âmbito da organização militar",
    "danificar ou inutilizar, por negligência, bem de terceiro em área militar",
    "deixar de devolver, no prazo, material recebido em carga ou empréstimo",
    "apresentar parte ou queixa sem fundamento ou por motivo fútil",
    "recorrer a autoridade estranha à cadeia de comando sem observar as normas",
    "representar contra superior sem observar os prazos e a forma regulamentares",
    "interceder por militar preso ou punido sem autorização",
    "visitar ou comunicar-se com preso sem autorização",
    "facilitar a fuga de preso ou deixar de impedi-la",
    "deixar de se identificar quando solicitado por autoridade competente",
    "deixar de prestar auxílio a militar ou civil em situação de risco quando possível",
    "casar-se sem observar as formalidades exigidas aos militares",
    "exercer atividade incompatível com a condição de militar",
    "ausentar-se da sede sem autorização, estando de sobreaviso",
    "deixar de comunicar mudança de endereço ou de situação pessoal à organização",
    "praticar ato contrário ao pundonor militar ou ao decoro da classe",
];

pub const AGGRAVATORS: [(char, &str); 9] = [
    ('a', "mau comportamento"),
    ('b', "reincidência"),
    ('c', "prática simultânea ou conexão de duas ou mais transgressões"),
    ('d', "conluio de duas ou mais pessoas"),
    ('e', "transgressão cometida durante a execução de serviço"),
    ('f', "transgressão cometida em presença de subordinado"),
    ('g', "abuso de autoridade hierárquica ou funcional"),
    ('h', "transgressão premeditada"),
    ('i', "transgressão cometida em presença de tropa ou de público"),
];

pub const MITIGATORS: [(char, &str); 6] = [
    ('a', "bom comportamento"),
    ('b', "relevância de serviços prestados"),
    ('c', "falta de prática do serviço"),
    ('d', "transgressão cometida para evitar mal maior"),
    ('e', "transgressão cometida em defesa própria, de seus direitos ou de outrem"),
    ('f', "transgressão cometida por ignorância plenamente comprovada"),
];

pub fn describe(number: u32) -> Option<&'static str> {
    let index = usize::try_from(number).ok()?.checked_sub(1)?;
    ITEMS.get(index).copied()
}

pub fn item(number: u32) -> Option<RegulatoryItem> {
    describe(number).map(|description| RegulatoryItem {
        number,
        description: description.to_string(),
    })
}

pub fn render_items() -> String {
    ITEMS
        .iter()
        .enumerate()
        .map(|(index, description)| format!("{}. {description}", index + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_letters(letters: &[(char, &str)]) -> String {
    letters
        .iter()
        .map(|(letter, description)| format!("{letter}) {description}"))
        .collect::<Vec<_>>()
        .join("\n")
}
